use crate::error::{AnalysisError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Column holding the glucose readings, in mg/dL
pub const GLUCOSE_COLUMN: &str = "Glucose_level";

/// Default PPG sampling rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 125;

/// Which CSV column carries the PPG waveform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalColumn {
    Position(usize), // zero-based, header name ignored
    Name(String),
}

impl Default for SignalColumn {
    fn default() -> Self {
        SignalColumn::Position(1)
    }
}

impl FromStr for SignalColumn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Invalid signal column: use a zero-based position (e.g. 1) or a header name".to_string());
        }
        match s.parse::<usize>() {
            Ok(position) => Ok(SignalColumn::Position(position)),
            Err(_) => Ok(SignalColumn::Name(s.to_string())),
        }
    }
}

impl SignalColumn {
    /// Resolve against the file's headers, failing if the column does not exist
    pub fn resolve(&self, headers: &[String]) -> Result<usize> {
        match self {
            SignalColumn::Position(position) if *position < headers.len() => Ok(*position),
            SignalColumn::Position(position) => {
                Err(AnalysisError::MissingColumn(format!("#{}", position)))
            }
            SignalColumn::Name(name) => headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AnalysisError::MissingColumn(name.clone())),
        }
    }
}

/// Rule-based glucose and heart-rate screening of uploaded CSV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Categorise blood glucose readings and suggest medication
    Glucose {
        /// CSV file with a glucose column
        input_path: PathBuf,

        /// Name of the glucose column
        #[arg(long, default_value = GLUCOSE_COLUMN)]
        column: String,

        /// CSV output file for per-reading results
        #[arg(long)]
        csv_output: Option<PathBuf>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Estimate heart rate from a PPG waveform and suggest medication
    HeartRate {
        /// CSV file with the PPG waveform
        input_path: PathBuf,

        /// Sampling rate of the waveform in Hz
        #[arg(long, env = "PPG_SAMPLE_RATE", default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Waveform column: zero-based position or header name
        #[arg(long, default_value = "1")]
        signal_column: SignalColumn,

        /// Remove baseline wander with a notch filter before peak detection
        #[arg(long)]
        remove_baseline: bool,

        /// Also report an FFT based heart rate estimate
        #[arg(long)]
        spectral: bool,

        /// CSV output file for the waveform with peak markers
        #[arg(long)]
        csv_output: Option<PathBuf>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["Time".to_string(), "PPG".to_string(), "Glucose_level".to_string()]
    }

    #[test]
    fn digits_parse_as_position() {
        assert_eq!("2".parse::<SignalColumn>(), Ok(SignalColumn::Position(2)));
        assert_eq!(
            "PPG".parse::<SignalColumn>(),
            Ok(SignalColumn::Name("PPG".to_string()))
        );
        assert!("  ".parse::<SignalColumn>().is_err());
    }

    #[test]
    fn default_is_second_column() {
        assert_eq!(SignalColumn::default().resolve(&headers()).unwrap(), 1);
    }

    #[test]
    fn resolve_rejects_unknown_columns() {
        assert!(matches!(
            SignalColumn::Position(3).resolve(&headers()),
            Err(AnalysisError::MissingColumn(_))
        ));
        assert!(matches!(
            SignalColumn::Name("ECG".to_string()).resolve(&headers()),
            Err(AnalysisError::MissingColumn(name)) if name == "ECG"
        ));
        assert_eq!(
            SignalColumn::Name("Glucose_level".to_string())
                .resolve(&headers())
                .unwrap(),
            2
        );
    }

    #[test]
    fn heart_rate_defaults() {
        let args = Args::try_parse_from(["vitals-screen", "heart-rate", "ppg.csv"]).unwrap();
        match args.command {
            Command::HeartRate {
                sample_rate,
                signal_column,
                remove_baseline,
                ..
            } => {
                // PPG_SAMPLE_RATE may be set in the environment
                if std::env::var("PPG_SAMPLE_RATE").is_err() {
                    assert_eq!(sample_rate, DEFAULT_SAMPLE_RATE);
                }
                assert_eq!(signal_column, SignalColumn::Position(1));
                assert!(!remove_baseline);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
