use anyhow::Context;
use clap::Parser;
use log::{debug, warn};
use std::path::Path;
use vitals_screen::config::{Args, Command, SignalColumn};
use vitals_screen::data_loading::{self, Table};
use vitals_screen::heart_analysis::{self, HeartRateOptions};
use vitals_screen::output::{self, Report};
use vitals_screen::{glucose, AnalysisError};

fn load_table(path: &Path) -> anyhow::Result<Table> {
    debug!("Loading file: {}", path.display());
    data_loading::read_csv_file(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))
}

/// Print empty-input conditions as a warning; everything else aborts
fn warn_or_fail<T>(result: Result<T, AnalysisError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_warning() => {
            warn!("{}", e);
            eprintln!("Warning: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_glucose(
    input_path: &Path,
    column: &str,
    csv_output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let table = load_table(input_path)?;
    let Some(assessment) = warn_or_fail(glucose::analyze_glucose_levels(&table, column))? else {
        return Ok(());
    };

    if json {
        let report = Report::new(input_path, &assessment, assessment.suggestions());
        println!("{}", report.to_json()?);
    } else {
        output::print_glucose_report(&table, &assessment);
    }

    if let Some(path) = csv_output {
        output::write_glucose_csv(path, &assessment)?;
    }
    Ok(())
}

fn run_heart_rate(
    input_path: &Path,
    sample_rate: u32,
    signal_column: &SignalColumn,
    options: HeartRateOptions,
    csv_output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let table = load_table(input_path)?;
    let Some(analysis) = warn_or_fail(heart_analysis::analyze_heart_rate(
        &table,
        signal_column,
        sample_rate,
        options,
    ))?
    else {
        return Ok(());
    };

    if json {
        let suggestions = vec![analysis.estimate.advice.to_string()];
        let report = Report::new(input_path, &analysis, suggestions);
        println!("{}", report.to_json()?);
    } else {
        output::print_heart_rate_report(&table, &analysis);
    }

    if let Some(path) = csv_output {
        output::write_peaks_csv(path, &analysis)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Glucose {
            input_path,
            column,
            csv_output,
            json,
        } => run_glucose(&input_path, &column, csv_output.as_deref(), json),
        Command::HeartRate {
            input_path,
            sample_rate,
            signal_column,
            remove_baseline,
            spectral,
            csv_output,
            json,
        } => run_heart_rate(
            &input_path,
            sample_rate,
            &signal_column,
            HeartRateOptions {
                remove_baseline,
                spectral,
            },
            csv_output.as_deref(),
            json,
        ),
    }
}
