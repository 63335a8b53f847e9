use crate::config::SignalColumn;
use crate::data_loading::{self, Table};
use crate::error::{AnalysisError, Result};
use log::{debug, info, warn};
use rustfft::{num_complex::Complex, FftPlanner};
use sci_rs::signal::filter::{design::Sos, sosfiltfilt_dyn};
use serde::Serialize;
use std::f32::consts::PI;
use std::fmt;

/// Below this rate the recording is flagged as bradycardia
pub const BRADYCARDIA_BPM: f32 = 60.0;
/// Above this rate the recording is flagged as tachycardia
pub const TACHYCARDIA_BPM: f32 = 100.0;

/// Frequency band searched by the spectral estimate, in BPM
const SPECTRAL_MIN_BPM: f32 = 40.0;
const SPECTRAL_MAX_BPM: f32 = 180.0;

/// Create a Hann window of the specified size
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Design notch or peak digital filter.
///
/// Parameters:
/// - w0: Frequency to remove from signal, in the same units as fs.
/// - q: Quality factor. Dimensionless parameter that characterizes notch filter -3 dB bandwidth bw
///      relative to its center frequency, Q = w0/bw.
/// - notch: notch filter when true, peak filter otherwise
/// - fs: The sampling frequency of the digital system
fn design_notch_peak_filter(w0: f32, q: f32, notch: bool, fs: f32) -> Result<(Vec<f32>, Vec<f32>)> {
    if fs <= 0.0 {
        return Err(AnalysisError::FilterDesign(format!("fs must be positive, got {}", fs)));
    }

    // Normalise so that 1.0 is the Nyquist frequency
    let w0 = 2.0 * w0 / fs;
    if !(w0 > 0.0 && w0 < 1.0) {
        return Err(AnalysisError::FilterDesign(format!(
            "w0 should be such that 0 < w0 < 1, got {}",
            w0
        )));
    }

    let bw = w0 / q * PI;
    let w0 = w0 * PI;

    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);

    let b = if notch {
        [1.0, -2.0 * w0.cos(), 1.0].iter().map(|x| x * gain).collect()
    } else {
        [1.0, 0.0, -1.0].iter().map(|x| x * (1.0 - gain)).collect()
    };

    let a = vec![1.0, -2.0 * gain * w0.cos(), 2.0 * gain - 1.0];

    Ok((b, a))
}

/// Creates a notch filter using the design_notch_peak_filter function
fn create_notch_filter(freq: f32, sample_rate: f32) -> Result<(Vec<f32>, Vec<f32>)> {
    let q = 0.005; // Fixed Q factor to match HeartPy
    design_notch_peak_filter(freq, q, true, sample_rate)
}

/// Convert transfer function coefficients to second-order sections
fn tf2sos(b: &[f32], a: &[f32]) -> Vec<[f32; 6]> {
    // A second-order filter needs a single section [b0, b1, b2, 1, a1, a2]
    vec![[b[0], b[1], b[2], 1.0, a[1] / a[0], a[2] / a[0]]]
}

/// Removes baseline wander using a zero-phase notch filter.
///
/// Signals too short for the forward-backward padding are returned unchanged.
pub fn remove_baseline_wander(data: &[f32], sample_rate: f32, cutoff: f32) -> Result<Vec<f32>> {
    let (b, a) = create_notch_filter(cutoff, sample_rate)?;
    let sos = tf2sos(&b, &a);

    let padlen = 3 * (2 * sos.len() + 1);
    if data.len() <= padlen {
        warn!(
            "Signal of {} samples is too short for baseline removal, skipping",
            data.len()
        );
        return Ok(data.to_vec());
    }

    let sos_array: Vec<Sos<f32>> = sos
        .iter()
        .map(|s| Sos::new([s[0], s[1], s[2]], [1.0, s[4], s[5]]))
        .collect();

    debug!(
        "Baseline removal: notch at {} Hz, fs {} Hz, sos {:?}",
        cutoff, sample_rate, sos
    );
    Ok(sosfiltfilt_dyn(data.iter(), &sos_array))
}

/// Indices of all local maxima. Flat peaks report their middle sample; the
/// first and last samples are never peaks.
pub fn local_maxima(data: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if data.len() < 3 {
        return peaks;
    }

    let i_max = data.len() - 1;
    let mut i = 1;
    while i < i_max {
        if data[i - 1] < data[i] {
            // Skip over a plateau
            let mut i_ahead = i + 1;
            while i_ahead < i_max && data[i_ahead] == data[i] {
                i_ahead += 1;
            }

            if data[i_ahead] < data[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Keep the highest peaks such that no two survivors are closer than
/// `distance` samples. Equal heights favour the earlier peak.
fn select_by_peak_distance(peaks: &[usize], data: &[f32], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];

    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| {
        data[peaks[b]]
            .total_cmp(&data[peaks[a]])
            .then_with(|| a.cmp(&b))
    });

    for &i in &priority {
        if !keep[i] {
            continue;
        }

        let mut k = i;
        while k > 0 && peaks[i] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        k = i + 1;
        while k < peaks.len() && peaks[k] - peaks[i] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(&p, _)| p)
        .collect()
}

/// Find peaks that are at least `distance` samples apart, in ascending order
pub fn find_peaks(data: &[f32], distance: usize) -> Vec<usize> {
    let candidates = local_maxima(data);
    let distance = distance.max(1);
    if distance == 1 {
        return candidates;
    }

    let peaks = select_by_peak_distance(&candidates, data, distance);
    debug!(
        "{} local maxima, {} kept with minimum distance {}",
        candidates.len(),
        peaks.len(),
        distance
    );
    peaks
}

/// Minimum spacing between beats: half a second of samples
pub fn min_peak_distance(sample_rate: u32) -> usize {
    (sample_rate / 2).max(1) as usize
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum HeartRhythm {
    Bradycardia,
    Normal,
    Tachycardia,
}

impl HeartRhythm {
    pub fn advice(&self) -> &'static str {
        match self {
            HeartRhythm::Bradycardia => {
                "Bradycardia detected. Suggested: Consult a doctor for evaluation."
            }
            HeartRhythm::Normal => "Normal heart rate. No medication required.",
            HeartRhythm::Tachycardia => {
                "Tachycardia detected. Suggested: Beta-blockers or consult a cardiologist."
            }
        }
    }
}

impl fmt::Display for HeartRhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub fn classify_bpm(bpm: f32) -> HeartRhythm {
    if bpm < BRADYCARDIA_BPM {
        HeartRhythm::Bradycardia
    } else if bpm <= TACHYCARDIA_BPM {
        HeartRhythm::Normal
    } else {
        HeartRhythm::Tachycardia
    }
}

/// Heart rate derived from peak count over the whole recording
#[derive(Debug, Clone, Serialize)]
pub struct HeartRateEstimate {
    pub bpm: f32,
    pub peaks: Vec<usize>,
    pub sample_count: usize,
    pub sample_rate: u32,
    pub duration_seconds: f32,
    pub rhythm: HeartRhythm,
    pub advice: &'static str,
}

pub fn estimate_heart_rate(signal: &[f32], sample_rate: u32) -> Result<HeartRateEstimate> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate(sample_rate));
    }
    if signal.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }

    let peaks = find_peaks(signal, min_peak_distance(sample_rate));

    // peaks * 60 / (n / fs), ordered to stay exact for whole-second recordings
    let bpm = peaks.len() as f32 * 60.0 * sample_rate as f32 / signal.len() as f32;
    let rhythm = classify_bpm(bpm);

    Ok(HeartRateEstimate {
        bpm,
        sample_count: signal.len(),
        sample_rate,
        duration_seconds: signal.len() as f32 / sample_rate as f32,
        rhythm,
        advice: rhythm.advice(),
        peaks,
    })
}

/// Intervals between consecutive peaks in milliseconds
pub fn rr_intervals(peaks: &[usize], sample_rate: f32) -> Vec<f32> {
    peaks
        .windows(2)
        .map(|window| (window[1] - window[0]) as f32 * 1000.0 / sample_rate)
        .collect()
}

/// Strongest spectral component in the heart rate band, in BPM
pub fn spectral_heart_rate(signal: &[f32], sample_rate: f32) -> Option<f32> {
    if signal.len() < 4 || sample_rate <= 0.0 {
        return None;
    }

    // Remove DC, then apply Hann window
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    let window = create_hann_window(signal.len());
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| Complex::new((s - mean) * w, 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(signal.len());
    fft.process(&mut buffer);

    let freq_resolution = sample_rate / signal.len() as f32;
    let min_bin = ((SPECTRAL_MIN_BPM / 60.0) / freq_resolution).ceil() as usize;
    let max_bin = (((SPECTRAL_MAX_BPM / 60.0) / freq_resolution) as usize).min(signal.len() / 2);
    if min_bin > max_bin {
        debug!(
            "Recording too short for spectral estimate (resolution {:.3} Hz)",
            freq_resolution
        );
        return None;
    }

    let mut max_magnitude = 0.0;
    let mut peak_bin = None;
    for bin in min_bin.max(1)..=max_bin {
        let magnitude = buffer[bin].norm();
        if magnitude > max_magnitude {
            max_magnitude = magnitude;
            peak_bin = Some(bin);
        }
    }

    peak_bin.map(|bin| bin as f32 * freq_resolution * 60.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeartRateOptions {
    pub remove_baseline: bool,
    pub spectral: bool,
}

/// Baseline removal cutoff in Hz
const BASELINE_CUTOFF_HZ: f32 = 0.05;

#[derive(Debug, Clone, Serialize)]
pub struct HeartRateAnalysis {
    pub column: String,
    pub baseline_removed: bool,
    pub estimate: HeartRateEstimate,
    pub spectral_bpm: Option<f32>,
    /// Waveform the peaks were detected on
    #[serde(skip)]
    pub signal: Vec<f32>,
}

/// Estimate heart rate from the waveform column of an uploaded table
pub fn analyze_heart_rate(
    table: &Table,
    signal_column: &SignalColumn,
    sample_rate: u32,
    options: HeartRateOptions,
) -> Result<HeartRateAnalysis> {
    let index = signal_column.resolve(&table.headers)?;
    let column = table.headers[index].clone();
    debug!("PPG signal column '{}' at position {}", column, index);

    let raw = data_loading::numeric_column(table, index)?;
    if raw.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate(sample_rate));
    }

    let signal = if options.remove_baseline {
        remove_baseline_wander(&raw, sample_rate as f32, BASELINE_CUTOFF_HZ)?
    } else {
        raw
    };

    let estimate = estimate_heart_rate(&signal, sample_rate)?;
    let spectral_bpm = if options.spectral {
        spectral_heart_rate(&signal, sample_rate as f32)
    } else {
        None
    };

    info!(
        "{} peaks over {:.1} s: {:.1} BPM ({})",
        estimate.peaks.len(),
        estimate.duration_seconds,
        estimate.bpm,
        estimate.rhythm
    );

    Ok(HeartRateAnalysis {
        column,
        baseline_removed: options.remove_baseline,
        estimate,
        spectral_bpm,
        signal,
    })
}
