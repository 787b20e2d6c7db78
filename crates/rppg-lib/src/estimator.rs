use crate::error::PulseError;
use crate::signal::hann;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

/// Zero-padding factor for the frequency-domain estimator. Padding refines
/// the frequency grid below the coarse native resolution of a few hundred
/// samples.
pub const ZERO_PAD_FACTOR: usize = 10;

/// Default relative amplitude threshold for peak acceptance.
pub const PEAK_THRESHOLD: f64 = 0.5;

/// Detected pulse peaks: sample indices, interpolated times within the
/// recording window, and amplitudes. Consumed by overlay plotting and the
/// time-domain BPM estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulsePeaks {
    pub indices: Vec<usize>,
    pub times: Vec<f64>,
    pub amplitudes: Vec<f64>,
}

impl PulsePeaks {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Linear-scan local-maxima finder.
///
/// A sample is a peak when both neighbors are strictly smaller and its value
/// reaches `threshold`, interpolated between the signal's min and max. Peaks
/// closer than `min_distance` samples to the previous accepted peak replace
/// it if they are higher, otherwise they are dropped. The greedy
/// replace-if-higher rule is deliberate; downstream RR intervals depend on
/// it.
pub fn find_peaks(signal: &[f64], threshold: f64, min_distance: usize) -> Vec<usize> {
    let mut peaks: Vec<usize> = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold_abs = min + threshold.clamp(0.0, 1.0) * (max - min);

    for i in 1..signal.len() - 1 {
        if !(signal[i - 1] < signal[i] && signal[i] > signal[i + 1]) {
            continue;
        }
        if signal[i] < threshold_abs {
            continue;
        }
        match peaks.last().copied() {
            Some(last) if i - last < min_distance => {
                if signal[i] > signal[last] {
                    *peaks.last_mut().unwrap() = i;
                }
            }
            _ => peaks.push(i),
        }
    }
    peaks
}

/// Run the peak finder over a conditioned window and attach times linearly
/// interpolated across the recorded duration.
pub fn pulse_peaks(
    signal: &[f64],
    duration: f64,
    min_rr_samples: usize,
    threshold: f64,
) -> PulsePeaks {
    let indices = find_peaks(signal, threshold, min_rr_samples);
    if indices.is_empty() || signal.len() < 2 {
        return PulsePeaks::default();
    }
    let step = duration / (signal.len() - 1) as f64;
    let times = indices.iter().map(|&i| i as f64 * step).collect();
    let amplitudes = indices.iter().map(|&i| signal[i]).collect();
    PulsePeaks {
        indices,
        times,
        amplitudes,
    }
}

/// Time-domain estimate: BPM from the mean RR interval of detected peaks.
pub fn bpm_from_peaks(peaks: &PulsePeaks) -> Result<f64, PulseError> {
    if peaks.times.len() < 2 {
        return Err(PulseError::InsufficientPeaks {
            found: peaks.times.len(),
        });
    }
    let mean_rr = peaks
        .times
        .windows(2)
        .map(|w| w[1] - w[0])
        .sum::<f64>()
        / (peaks.times.len() - 1) as f64;
    if mean_rr <= 0.0 {
        return Err(PulseError::InsufficientData);
    }
    Ok(60.0 / mean_rr)
}

/// Frequency-domain estimate: Hann-window the signal, zero-pad, transform,
/// and report the BPM of the strongest bin inside [min_bpm, max_bpm]. More
/// robust to noisy peak detection than RR averaging, and the preferred
/// default.
pub fn bpm_from_spectrum(
    signal: &[f64],
    fs: f64,
    min_bpm: f64,
    max_bpm: f64,
) -> Result<f64, PulseError> {
    let n = signal.len();
    if n < 2 || !fs.is_finite() || fs <= 0.0 {
        return Err(PulseError::InsufficientData);
    }
    let padded = n * ZERO_PAD_FACTOR;
    let window = hann(n);
    let mut buf = vec![0.0; padded];
    for i in 0..n {
        buf[i] = signal[i] * window[i];
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(padded);
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut buf, &mut spectrum).unwrap();

    let bin_bpm = fs * 60.0 / padded as f64;
    let mut best: Option<(f64, f64)> = None;
    for (k, bin) in spectrum.iter().enumerate() {
        let bpm = k as f64 * bin_bpm;
        if bpm < min_bpm || bpm > max_bpm {
            continue;
        }
        let magnitude = bin.norm();
        if best.map_or(true, |(_, m)| magnitude > m) {
            best = Some((bpm, magnitude));
        }
    }
    best.map(|(bpm, _)| bpm).ok_or(PulseError::InsufficientData)
}
