use crate::error::PulseError;
use crate::estimator::{self, PulsePeaks};
use crate::frame::{Channel, Frame};
use crate::signal;
use crate::window::{FlagWindow, SampleWindow};
use log::debug;
use serde::{Deserialize, Serialize};

/// Allowed deviation between the recorded window duration and the configured
/// target before the window counts as temporally complete. Guards against
/// frame-rate drift producing a nominally full but too-short or too-long
/// recording.
pub const DURATION_TOLERANCE_S: f64 = 0.05;

/// How the raw sample sequence is restricted to the heart-rate band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandpassMode {
    /// FFT-domain band restriction between the configured BPM bounds.
    Fft,
    /// Length-N boxcar FIR smoothing, N = the configured bandpass order.
    /// Drops the N-1 warm-up samples.
    MovingAverage,
}

/// Immutable per-session configuration for a pulse extractor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Frames per second actually reaching the extractor.
    pub framerate: f64,
    /// Target recording window in seconds.
    pub window_seconds: f64,
    /// Laplacian-stddev bound for the presence gate, reused as the bound on
    /// raw-sample movement.
    pub clarity_threshold: f64,
    /// Physiologically plausible heart-rate range, BPM.
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// FIR length for the moving-average bandpass mode.
    pub bandpass_order: usize,
    pub bandpass_mode: BandpassMode,
    /// Histogram channel sampled per frame.
    pub channel: Channel,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            framerate: 30.0,
            window_seconds: 3.0,
            clarity_threshold: 40.0,
            min_bpm: 40.0,
            max_bpm: 200.0,
            bandpass_order: 5,
            bandpass_mode: BandpassMode::Fft,
            channel: Channel::Green,
        }
    }
}

impl ExtractorConfig {
    /// Window capacity in samples.
    pub fn capacity(&self) -> usize {
        (self.framerate * self.window_seconds).round().max(1.0) as usize
    }

    pub fn min_hz(&self) -> f64 {
        self.min_bpm / 60.0
    }

    pub fn max_hz(&self) -> f64 {
        self.max_bpm / 60.0
    }

    /// Shortest plausible RR interval, seconds.
    pub fn min_rr_s(&self) -> f64 {
        60.0 / self.max_bpm
    }
}

/// Readiness of the accumulated window. BPM values are only meaningful in
/// `Warm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    /// Window not yet full, timing not yet stable, or gate recently failed.
    Cold,
    /// Full window, stable timing, presence over the whole recording.
    Warm,
}

/// Finger/region photoplethysmography pipeline: per-frame centroid sampling,
/// sliding windows, presence gating and BPM estimation for one measurement
/// session.
#[derive(Debug, Clone)]
pub struct PpgExtractor {
    config: ExtractorConfig,
    samples: SampleWindow,
    presence: FlagWindow,
    readiness: Readiness,
    last_sharpness: f64,
    movement: f64,
}

impl PpgExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let capacity = config.capacity();
        Self {
            config,
            samples: SampleWindow::new(capacity),
            presence: FlagWindow::new(capacity),
            readiness: Readiness::Cold,
            last_sharpness: 0.0,
            movement: f64::INFINITY,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Ingest one frame. The sample is derived before any buffer mutation so
    /// a malformed frame is rejected without corrupting the session. A
    /// presence-gate failure is not an error: it resets the whole window and
    /// the call still succeeds.
    pub fn add_frame(&mut self, frame: &Frame, timestamp: f64) -> Result<(), PulseError> {
        let sample = frame.centroid(self.config.channel)?;
        let present = self.detect_presence(frame);

        self.samples.push(timestamp, sample);
        self.presence.push(present);

        if !present {
            debug!(
                "presence gate failed (sharpness {:.2} >= {:.2}), discarding window",
                self.last_sharpness, self.config.clarity_threshold
            );
            self.reset();
            return Ok(());
        }

        self.movement = self.samples.stddev();
        self.update_readiness();
        Ok(())
    }

    /// Presence heuristic: a finger pressed flat on the lens leaves the frame
    /// blurred, so presence means sharpness *below* the clarity threshold.
    /// The inversion is intentional.
    pub fn detect_presence(&mut self, frame: &Frame) -> bool {
        self.last_sharpness = frame.sharpness();
        self.last_sharpness < self.config.clarity_threshold
    }

    fn update_readiness(&mut self) {
        // The raw span covers capacity-1 intervals; one mean interval is
        // added back so a perfectly timed full window lands on the target
        // duration at any framerate.
        let interval = self.samples.mean_interval();
        let recorded = if interval.is_finite() {
            self.samples.duration() + interval
        } else {
            self.samples.duration()
        };
        let duration_ok = (recorded - self.config.window_seconds).abs() < DURATION_TOLERANCE_S;
        let warm = self.samples.is_full()
            && duration_ok
            && self.presence.all_set()
            && self.movement < self.config.clarity_threshold;
        if warm && self.readiness == Readiness::Cold {
            debug!(
                "window warm: {} samples over {:.2}s",
                self.samples.len(),
                self.samples.duration()
            );
        }
        self.readiness = if warm { Readiness::Warm } else { Readiness::Cold };
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// True only while the window is full, temporally on target, gated
    /// present throughout, and steady.
    pub fn pulse_signal_available(&self) -> bool {
        self.readiness == Readiness::Warm
    }

    /// Discard the accumulated session. A single missed frame invalidates
    /// all history; restarting is preferred over partial-window estimates.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.presence.clear();
        self.readiness = Readiness::Cold;
        self.movement = f64::INFINITY;
    }

    /// Samples within the trailing recording window, rescaled to [-1, 1];
    /// optionally band-restricted per the configured mode.
    pub fn signal(&self, bandpass: bool) -> Vec<f64> {
        let raw = self.samples.tail(self.config.window_seconds);
        let scaled = signal::rescale(&raw);
        if !bandpass {
            return scaled;
        }
        match self.config.bandpass_mode {
            BandpassMode::Fft => signal::bandpass(
                &scaled,
                self.samples.mean_rate(),
                self.config.min_hz(),
                self.config.max_hz(),
            ),
            BandpassMode::MovingAverage => {
                signal::moving_average(&scaled, self.config.bandpass_order)
            }
        }
    }

    /// Raw sample window, for waveform plotting.
    pub fn samples(&self) -> &SampleWindow {
        &self.samples
    }

    /// Sharpness of the most recent frame.
    pub fn sharpness(&self) -> f64 {
        self.last_sharpness
    }

    /// Standard deviation of the raw samples; infinite until measured.
    pub fn movement(&self) -> f64 {
        self.movement
    }

    /// Fill fraction of the window, for progress display.
    pub fn progress(&self) -> f64 {
        self.samples.len() as f64 / self.samples.capacity() as f64
    }

    /// Peak positions, times and amplitudes over the current window.
    pub fn pulse_peaks(&self) -> PulsePeaks {
        let signal = self.signal(false);
        let duration = self.samples.tail_duration(self.config.window_seconds);
        let interval = self.samples.mean_interval();
        let min_rr_samples = if interval.is_finite() && interval > 0.0 {
            (self.config.min_rr_s() / interval).round() as usize
        } else {
            1
        };
        estimator::pulse_peaks(
            &signal,
            duration,
            min_rr_samples.max(1),
            estimator::PEAK_THRESHOLD,
        )
    }

    /// Heart rate by frequency-domain peak picking, the preferred estimate.
    /// Callers should check `pulse_signal_available` first; querying early
    /// yields `InsufficientData`, never a bogus number.
    pub fn bpm(&self) -> Result<f64, PulseError> {
        estimator::bpm_from_spectrum(
            &self.signal(false),
            self.samples.mean_rate(),
            self.config.min_bpm,
            self.config.max_bpm,
        )
    }

    /// Heart rate from averaged RR intervals of detected peaks.
    pub fn bpm_from_peaks(&self) -> Result<f64, PulseError> {
        estimator::bpm_from_peaks(&self.pulse_peaks())
    }
}

/// Pulse-estimation strategy for a measurement session. One concrete
/// pipeline, plus an explicitly unimplemented variant instead of a
/// speculative subclass hierarchy.
#[derive(Debug, Clone)]
pub enum PulseExtractor {
    Ppg(PpgExtractor),
    /// Eulerian video magnification; reserved. Every operation fails loudly.
    VideoMagnification,
}

impl PulseExtractor {
    pub fn ppg(config: ExtractorConfig) -> Self {
        Self::Ppg(PpgExtractor::new(config))
    }

    pub fn add_frame(&mut self, frame: &Frame, timestamp: f64) -> Result<(), PulseError> {
        match self {
            Self::Ppg(inner) => inner.add_frame(frame, timestamp),
            Self::VideoMagnification => {
                Err(PulseError::NotImplemented("eulerian video magnification"))
            }
        }
    }

    pub fn pulse_signal_available(&self) -> bool {
        match self {
            Self::Ppg(inner) => inner.pulse_signal_available(),
            Self::VideoMagnification => false,
        }
    }

    pub fn bpm(&self) -> Result<f64, PulseError> {
        match self {
            Self::Ppg(inner) => inner.bpm(),
            Self::VideoMagnification => {
                Err(PulseError::NotImplemented("eulerian video magnification"))
            }
        }
    }

    pub fn pulse_peaks(&self) -> Result<PulsePeaks, PulseError> {
        match self {
            Self::Ppg(inner) => Ok(inner.pulse_peaks()),
            Self::VideoMagnification => {
                Err(PulseError::NotImplemented("eulerian video magnification"))
            }
        }
    }

    pub fn reset(&mut self) {
        if let Self::Ppg(inner) = self {
            inner.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ColorFormat;
    use std::f64::consts::PI;

    const SIZE: usize = 16;

    /// Uniform frame whose green channel carries the pulse level. Uniform
    /// pixels have zero Laplacian, so the presence gate sees a finger.
    fn pulse_frame(level: f64) -> Vec<u8> {
        let g = level.round().clamp(0.0, 255.0) as u8;
        let mut pixels = Vec::with_capacity(SIZE * SIZE * 3);
        for _ in 0..SIZE * SIZE {
            pixels.extend_from_slice(&[90, g, 70]);
        }
        pixels
    }

    /// High-contrast frame; sharp, so the gate reports no finger.
    fn uncovered_frame() -> Vec<u8> {
        let mut pixels = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        pixels
    }

    fn feed_sinusoid(extractor: &mut PpgExtractor, frames: usize, bpm: f64) {
        let fs = extractor.config().framerate;
        for i in 0..frames {
            let t = i as f64 / fs;
            let level = 128.0 + 10.0 * (2.0 * PI * bpm / 60.0 * t).sin();
            let pixels = pulse_frame(level);
            let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
            extractor.add_frame(&frame, t).unwrap();
        }
    }

    #[test]
    fn full_window_of_72_bpm_becomes_available() {
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        feed_sinusoid(&mut extractor, 90, 72.0);

        assert!(extractor.pulse_signal_available());
        let bpm = extractor.bpm().unwrap();
        assert!((bpm - 72.0).abs() <= 3.0, "bpm {bpm}");
    }

    #[test]
    fn low_framerate_session_warms_up_on_time() {
        // 45 perfectly timed frames at 15 Hz span 44 intervals; the readiness
        // check must credit the missing interval or the window can never
        // reach the 3 s target.
        let config = ExtractorConfig {
            framerate: 15.0,
            ..ExtractorConfig::default()
        };
        let mut extractor = PpgExtractor::new(config);
        feed_sinusoid(&mut extractor, 45, 72.0);

        assert!(extractor.samples().is_full());
        assert!(extractor.pulse_signal_available());
        let bpm = extractor.bpm().unwrap();
        assert!((bpm - 72.0).abs() <= 3.0, "bpm {bpm}");
    }

    #[test]
    fn single_uncovered_frame_discards_the_window() {
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        feed_sinusoid(&mut extractor, 50, 72.0);
        assert_eq!(extractor.samples().len(), 50);

        let pixels = uncovered_frame();
        let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
        extractor.add_frame(&frame, 50.0 / 30.0).unwrap();

        assert_eq!(extractor.samples().len(), 0);
        assert!(!extractor.pulse_signal_available());
    }

    #[test]
    fn gate_failure_after_a_full_window_goes_cold_again() {
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        feed_sinusoid(&mut extractor, 90, 72.0);
        assert_eq!(extractor.readiness(), Readiness::Warm);

        let pixels = uncovered_frame();
        let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
        extractor.add_frame(&frame, 3.1).unwrap();
        assert_eq!(extractor.readiness(), Readiness::Cold);
        assert_eq!(extractor.samples().len(), 0);
    }

    #[test]
    fn bpm_before_any_frames_is_a_typed_error() {
        let extractor = PpgExtractor::new(ExtractorConfig::default());
        assert!(matches!(
            extractor.bpm(),
            Err(PulseError::InsufficientData)
        ));
        assert!(matches!(
            extractor.bpm_from_peaks(),
            Err(PulseError::InsufficientPeaks { found: 0 })
        ));
    }

    #[test]
    fn reset_is_idempotent_and_fresh() {
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        feed_sinusoid(&mut extractor, 30, 72.0);
        extractor.reset();
        extractor.reset();

        assert!(extractor.samples().is_empty());
        assert!(!extractor.pulse_signal_available());
        assert!(extractor.movement().is_infinite());
        assert_eq!(extractor.progress(), 0.0);
    }

    #[test]
    fn shaking_measurement_never_warms_up() {
        // Huge sample swings: gate passes (uniform frames) but the movement
        // bound fails.
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        let fs = extractor.config().framerate;
        for i in 0..90 {
            let level = if i % 2 == 0 { 10.0 } else { 250.0 };
            let pixels = pulse_frame(level);
            let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
            extractor.add_frame(&frame, i as f64 / fs).unwrap();
        }
        assert!(extractor.samples().is_full());
        assert!(!extractor.pulse_signal_available());
    }

    #[test]
    fn drifting_frame_times_never_warm_up() {
        // Frames arrive at half the configured rate, so a "full" window spans
        // twice the target duration.
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        for i in 0..90 {
            let t = i as f64 / 15.0;
            let level = 128.0 + 10.0 * (2.0 * PI * 1.2 * t).sin();
            let pixels = pulse_frame(level);
            let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
            extractor.add_frame(&frame, t).unwrap();
        }
        assert!(extractor.samples().is_full());
        assert!(!extractor.pulse_signal_available());
    }

    #[test]
    fn video_magnification_fails_loudly() {
        let mut extractor = PulseExtractor::VideoMagnification;
        let pixels = pulse_frame(128.0);
        let frame = Frame::new(&pixels, SIZE, SIZE, ColorFormat::Rgb).unwrap();
        assert!(matches!(
            extractor.add_frame(&frame, 0.0),
            Err(PulseError::NotImplemented(_))
        ));
        assert!(matches!(
            extractor.bpm(),
            Err(PulseError::NotImplemented(_))
        ));
        assert!(!extractor.pulse_signal_available());
    }

    #[test]
    fn conditioned_signal_is_zero_mean() {
        let mut extractor = PpgExtractor::new(ExtractorConfig::default());
        feed_sinusoid(&mut extractor, 90, 72.0);
        let conditioned = extractor.signal(true);
        assert_eq!(conditioned.len(), 90);
        let mean = conditioned.iter().sum::<f64>() / conditioned.len() as f64;
        assert!(mean.abs() < 1e-6);
    }
}
