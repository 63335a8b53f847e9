use crate::data_loading::Table;
use crate::glucose::{
    GlucoseAssessment, HistogramBin, RiskLevel, DIABETES_THRESHOLD, PREDIABETES_THRESHOLD,
};
use crate::heart_analysis::{self, HeartRateAnalysis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Rows shown in data previews
pub const PREVIEW_ROWS: usize = 5;

const HISTOGRAM_WIDTH: usize = 40;

/// Render rows as a fixed-width text table with a leading row index
pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let index_width = rows.len().saturating_sub(1).to_string().len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let _ = write!(out, "{:>w$}", "", w = index_width);
    for (header, width) in headers.iter().zip(&widths) {
        let _ = write!(out, "  {:>w$}", header, w = width);
    }
    out.push('\n');

    for (idx, row) in rows.iter().enumerate() {
        let _ = write!(out, "{:>w$}", idx, w = index_width);
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(out, "  {:>w$}", cell, w = width);
        }
        out.push('\n');
    }

    out
}

/// First rows of the uploaded file
pub fn format_preview(table: &Table) -> String {
    let rows: Vec<Vec<String>> = table
        .head(PREVIEW_ROWS)
        .iter()
        .map(|record| record.iter().map(str::to_string).collect())
        .collect();
    format_table(&table.headers, &rows)
}

fn threshold_marker(bin: &HistogramBin, is_last: bool) -> Option<&'static str> {
    let contains = |t: f64| bin.lower <= t && (t < bin.upper || (is_last && t == bin.upper));
    if contains(DIABETES_THRESHOLD) {
        Some("<- Diabetes (125 mg/dL)")
    } else if contains(PREDIABETES_THRESHOLD) {
        Some("<- Prediabetes (100 mg/dL)")
    } else {
        None
    }
}

/// Text rendering of the glucose distribution with the risk thresholds marked
pub fn format_histogram(bins: &[HistogramBin]) -> String {
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let mut out = String::new();

    for (i, bin) in bins.iter().enumerate() {
        let bar = "#".repeat(bin.count * HISTOGRAM_WIDTH / max_count);
        let _ = write!(
            out,
            "  {:>7.1} - {:>7.1} | {:<w$} {:>3}",
            bin.lower,
            bin.upper,
            bar,
            bin.count,
            w = HISTOGRAM_WIDTH
        );
        if let Some(marker) = threshold_marker(bin, i + 1 == bins.len()) {
            let _ = write!(out, "  {}", marker);
        }
        out.push('\n');
    }

    out
}

pub fn print_glucose_report(table: &Table, assessment: &GlucoseAssessment) {
    println!("Uploaded Data Preview");
    print!("{}", format_preview(table));

    println!("\nData Preview with Risk Levels");
    let rows: Vec<Vec<String>> = assessment
        .readings
        .iter()
        .take(PREVIEW_ROWS)
        .map(|r| {
            vec![
                r.display_value(assessment.float_column),
                r.risk_level.to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(&[assessment.column.clone(), "Risk Level".to_string()], &rows)
    );

    println!("\nGlucose Level Distribution (mg/dL)");
    print!("{}", format_histogram(&assessment.histogram()));
    println!(
        "  Normal: {}  Prediabetes: {}  Diabetes: {}",
        assessment.count(RiskLevel::Normal),
        assessment.count(RiskLevel::Prediabetes),
        assessment.count(RiskLevel::Diabetes)
    );
    if assessment.dropped > 0 {
        println!("  ({} rows without a reading were skipped)", assessment.dropped);
    }

    println!("\nMedication Suggestions");
    for suggestion in assessment.suggestions() {
        println!("{}", suggestion);
    }
}

pub fn print_heart_rate_report(table: &Table, analysis: &HeartRateAnalysis) {
    let estimate = &analysis.estimate;

    println!("Uploaded Data Preview");
    print!("{}", format_preview(table));

    println!("\nPPG Signal ({})", analysis.column);
    println!(
        "  {} samples at {} Hz ({:.1} s){}",
        estimate.sample_count,
        estimate.sample_rate,
        estimate.duration_seconds,
        if analysis.baseline_removed {
            ", baseline wander removed"
        } else {
            ""
        }
    );

    let shown: Vec<String> = estimate.peaks.iter().take(10).map(|p| p.to_string()).collect();
    println!(
        "  Detected {} peaks at samples [{}{}]",
        estimate.peaks.len(),
        shown.join(", "),
        if estimate.peaks.len() > shown.len() { ", ..." } else { "" }
    );

    let rr = heart_analysis::rr_intervals(&estimate.peaks, estimate.sample_rate as f32);
    if !rr.is_empty() {
        let mean_rr = rr.iter().sum::<f32>() / rr.len() as f32;
        println!("  Mean beat interval: {:.0} ms", mean_rr);
    }

    println!("\nEstimated Heart Rate: {:.2} BPM", estimate.bpm);
    if let Some(spectral) = analysis.spectral_bpm {
        println!("  Spectral estimate: {:.1} BPM", spectral);
    }

    println!("\nMedication Suggestion");
    println!("{}", estimate.advice);
}

fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    println!("Writing results to {}", path.display());
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    Ok(csv::Writer::from_writer(file))
}

/// One row per classified reading
pub fn write_glucose_csv(path: &Path, assessment: &GlucoseAssessment) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record([
        "row",
        assessment.column.as_str(),
        "risk_level",
        "advice",
    ])?;

    for reading in &assessment.readings {
        writer.write_record(&[
            reading.row.to_string(),
            reading.value.to_string(),
            reading.risk_level.to_string(),
            reading.advice().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// One row per sample with detected peaks flagged
pub fn write_peaks_csv(path: &Path, analysis: &HeartRateAnalysis) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["sample", "time_seconds", "amplitude", "is_peak"])?;

    let sample_rate = analysis.estimate.sample_rate as f32;
    let mut peaks = analysis.estimate.peaks.iter().peekable();
    for (i, amplitude) in analysis.signal.iter().enumerate() {
        let is_peak = peaks.next_if(|&&p| p == i).is_some();
        writer.write_record(&[
            i.to_string(),
            format!("{:.4}", i as f32 / sample_rate),
            amplitude.to_string(),
            (is_peak as u8).to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// JSON envelope for one analysed file
#[derive(Debug, Serialize)]
pub struct Report<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub analysis: &'a T,
    pub suggestions: Vec<String>,
}

impl<'a, T: Serialize> Report<'a, T> {
    pub fn new(input: &Path, analysis: &'a T, suggestions: Vec<String>) -> Self {
        Report {
            generated_at: Utc::now(),
            input: input.display().to_string(),
            analysis,
            suggestions,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glucose::analyze_glucose_levels;
    use crate::heart_analysis::{estimate_heart_rate, HeartRateAnalysis};

    fn assessment() -> GlucoseAssessment {
        let table = Table::from_reader(
            "Glucose_level\n80\n110\n130\n99.9\n100\n125\n".as_bytes(),
        )
        .unwrap();
        analyze_glucose_levels(&table, "Glucose_level").unwrap()
    }

    #[test]
    fn table_is_right_aligned_with_index() {
        let text = format_table(
            &["a".to_string(), "long".to_string()],
            &[
                vec!["1".to_string(), "2".to_string()],
                vec!["333".to_string(), "4".to_string()],
            ],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["     a  long", "0    1     2", "1  333     4"]);
    }

    #[test]
    fn histogram_marks_thresholds() {
        let text = format_histogram(&assessment().histogram());
        assert_eq!(text.lines().count(), 20);
        assert_eq!(text.matches("Prediabetes (100 mg/dL)").count(), 1);
        assert_eq!(text.matches("Diabetes (125 mg/dL)").count(), 1);
    }

    #[test]
    fn glucose_csv_has_a_row_per_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("glucose.csv");
        write_glucose_csv(&path, &assessment()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "row,Glucose_level,risk_level,advice");
        assert_eq!(
            lines[3],
            "2,130,Diabetes,Consult a doctor. Medications like Metformin may be recommended."
        );
    }

    #[test]
    fn peaks_csv_flags_peaks() {
        let signal = vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0];
        let estimate = estimate_heart_rate(&signal, 2).unwrap();
        let analysis = HeartRateAnalysis {
            column: "PPG".to_string(),
            baseline_removed: false,
            estimate,
            spectral_bpm: None,
            signal,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.csv");
        write_peaks_csv(&path, &analysis).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let flags: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(flags, vec!["0", "1", "0", "0", "1", "0"]);
    }

    #[test]
    fn json_report_contains_levels() {
        let assessment = assessment();
        let report = Report::new(Path::new("glucose.csv"), &assessment, assessment.suggestions());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["input"], "glucose.csv");
        assert_eq!(json["analysis"]["readings"][2]["risk_level"], "Diabetes");
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 5);
    }
}
