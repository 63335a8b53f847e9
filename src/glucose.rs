use crate::data_loading::{self, Table};
use crate::error::{AnalysisError, Result};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

/// Lower bound of the prediabetes range, mg/dL
pub const PREDIABETES_THRESHOLD: f64 = 100.0;
/// Lower bound of the diabetes range, mg/dL
pub const DIABETES_THRESHOLD: f64 = 125.0;
/// Number of suggestion lines shown to the user
pub const MAX_SUGGESTIONS: usize = 5;
/// Bins in the glucose distribution
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum RiskLevel {
    Normal,
    Prediabetes,
    Diabetes,
}

impl RiskLevel {
    pub fn advice(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "No medication needed. Maintain a balanced diet.",
            RiskLevel::Prediabetes => "Consider lifestyle changes, exercise, and diet control.",
            RiskLevel::Diabetes => {
                "Consult a doctor. Medications like Metformin may be recommended."
            }
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub fn classify(value: f64) -> RiskLevel {
    if value < PREDIABETES_THRESHOLD {
        RiskLevel::Normal
    } else if value < DIABETES_THRESHOLD {
        RiskLevel::Prediabetes
    } else {
        RiskLevel::Diabetes
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GlucoseReading {
    /// Zero-based data row in the uploaded file
    pub row: usize,
    /// mg/dL
    pub value: f64,
    pub risk_level: RiskLevel,
}

impl GlucoseReading {
    pub fn new(row: usize, value: f64) -> Self {
        GlucoseReading {
            row,
            value,
            risk_level: classify(value),
        }
    }

    pub fn advice(&self) -> &'static str {
        self.risk_level.advice()
    }

    /// Reading as the user sees it. Float columns always show a decimal
    /// part, so 80 prints as `80.0` next to a `99.9`.
    pub fn display_value(&self, float_column: bool) -> String {
        let whole = self.value.is_finite() && self.value.fract() == 0.0 && self.value.abs() < 1e16;
        if float_column && whole {
            format!("{:.1}", self.value)
        } else {
            self.value.to_string()
        }
    }

    pub fn suggestion(&self, float_column: bool) -> String {
        format!(
            " Glucose Level: {} mg/dL - {}",
            self.display_value(float_column),
            self.risk_level.advice()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlucoseAssessment {
    pub column: String,
    pub readings: Vec<GlucoseReading>,
    pub dropped: usize,
    /// Column holds decimals or gaps, so readings render as floats
    pub float_column: bool,
}

impl GlucoseAssessment {
    /// Suggestion lines for the first readings, as shown to the user
    pub fn suggestions(&self) -> Vec<String> {
        self.readings
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(|r| r.suggestion(self.float_column))
            .collect()
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        self.readings
            .iter()
            .filter(|r| r.risk_level == level)
            .count()
    }

    pub fn histogram(&self) -> Vec<HistogramBin> {
        let values: Vec<f64> = self.readings.iter().map(|r| r.value).collect();
        histogram(&values, HISTOGRAM_BINS)
    }
}

/// Equal-width bins between the smallest and largest value. The last bin is
/// closed on the right.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min_val = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_val = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let range = max_val - min_val;

    if range == 0.0 || !range.is_finite() {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: values.len(),
        }];
    }

    let width = range / bins as f64;
    let mut counts = vec![0; bins];
    for &v in values {
        let idx = (((v - min_val) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min_val + width * i as f64,
            upper: if i == bins - 1 {
                max_val
            } else {
                min_val + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

/// Classify every value in order
pub fn classify_all(values: &[f64]) -> Vec<RiskLevel> {
    values.iter().map(|&v| classify(v)).collect()
}

/// Classify the glucose column of an uploaded table
pub fn analyze_glucose_levels(table: &Table, column: &str) -> Result<GlucoseAssessment> {
    let index = table
        .column_index(column)
        .ok_or_else(|| AnalysisError::MissingColumn(column.to_string()))?;
    debug!("Glucose column '{}' at position {}", column, index);

    let values = data_loading::numeric_column_dropna(table, index)?;
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput("glucose"));
    }

    let readings: Vec<GlucoseReading> = values
        .into_iter()
        .map(|(row, value)| GlucoseReading::new(row, value))
        .collect();

    let assessment = GlucoseAssessment {
        column: column.to_string(),
        dropped: table.len() - readings.len(),
        float_column: data_loading::is_float_column(table, index),
        readings,
    };

    info!(
        "Classified {} glucose readings: {} normal, {} prediabetes, {} diabetes",
        assessment.readings.len(),
        assessment.count(RiskLevel::Normal),
        assessment.count(RiskLevel::Prediabetes),
        assessment.count(RiskLevel::Diabetes)
    );

    Ok(assessment)
}
