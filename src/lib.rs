pub mod config;
pub mod data_loading;
pub mod error;
pub mod glucose;
pub mod heart_analysis;
pub mod output;

pub use error::{AnalysisError, Result};
pub use glucose::{analyze_glucose_levels, classify, GlucoseAssessment, GlucoseReading, RiskLevel};
pub use heart_analysis::{
    analyze_heart_rate, classify_bpm, estimate_heart_rate, find_peaks, HeartRateAnalysis,
    HeartRateEstimate, HeartRateOptions, HeartRhythm,
};
