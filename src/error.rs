use thiserror::Error;

/// Errors raised while screening an uploaded file
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("The uploaded file must contain a '{0}' column.")]
    MissingColumn(String),

    #[error("No {0} data found in the uploaded file.")]
    EmptyInput(&'static str),

    #[error("The signal is empty, heart rate is undefined.")]
    EmptySignal,

    #[error("Row {row}: column '{column}' holds a non-numeric value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Sample rate must be a positive number of samples per second, got {0}")]
    InvalidSampleRate(u32),

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Whether this should be shown as a warning rather than abort the run
    pub fn is_warning(&self) -> bool {
        matches!(self, AnalysisError::EmptyInput(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_empty_input_is_a_warning() {
        assert!(AnalysisError::EmptyInput("glucose").is_warning());
        assert!(!AnalysisError::EmptySignal.is_warning());
        assert!(!AnalysisError::MissingColumn("Glucose_level".to_string()).is_warning());
    }

    #[test]
    fn missing_column_message_names_the_column() {
        let err = AnalysisError::MissingColumn("Glucose_level".to_string());
        assert_eq!(
            err.to_string(),
            "The uploaded file must contain a 'Glucose_level' column."
        );
    }
}
