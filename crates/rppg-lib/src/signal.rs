use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Rescale into [-1, 1] using the observed min/max. A flat signal maps to 0.
pub fn rescale(signal: &[f64]) -> Vec<f64> {
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if !span.is_finite() || span == 0.0 {
        return vec![0.0; signal.len()];
    }
    signal
        .iter()
        .map(|v| 2.0 * (v - min) / span - 1.0)
        .collect()
}

/// Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
        .collect()
}

/// FFT-domain bandpass: transform, zero every bin outside [low_hz, high_hz],
/// transform back. Output is zero-mean since the DC bin is always outside a
/// positive band.
pub fn bandpass(signal: &[f64], fs: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    let n = signal.len();
    if n < 2 || !fs.is_finite() || fs <= 0.0 {
        return signal.to_vec();
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let c2r = planner.plan_fft_inverse(n);

    let mut buf = signal.to_vec();
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut buf, &mut spectrum).unwrap();

    let bin_hz = fs / n as f64;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let freq = k as f64 * bin_hz;
        if freq < low_hz || freq > high_hz {
            *bin = Complex::new(0.0, 0.0);
        }
    }

    let mut out = c2r.make_output_vec();
    c2r.process(&mut spectrum, &mut out).unwrap();
    // realfft leaves the round trip scaled by n.
    let scale = 1.0 / n as f64;
    out.iter_mut().for_each(|v| *v *= scale);
    out
}

/// Length-N boxcar FIR (coefficients 1/N), the moving-average bandpass
/// alternative. The first N-1 warm-up outputs are discarded, so the result is
/// `signal.len() - n + 1` samples long.
pub fn moving_average(signal: &[f64], n: usize) -> Vec<f64> {
    let n = n.max(1);
    if signal.len() < n {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(signal.len() - n + 1);
    let mut acc: f64 = signal[..n].iter().sum();
    out.push(acc / n as f64);
    for i in n..signal.len() {
        acc += signal[i] - signal[i - n];
        out.push(acc / n as f64);
    }
    out
}
