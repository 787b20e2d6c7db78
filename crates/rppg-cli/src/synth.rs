use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;

/// Side length of generated square frames.
pub const FRAME_SIZE: usize = 16;

/// Deterministic synthetic finger-on-lens session: uniform RGB frames whose
/// green channel follows a sinusoidal pulse wave, with optional seeded noise
/// on the level. Uniform pixels keep the sharpness near zero, so the
/// presence gate sees a finger on every frame.
pub struct SyntheticSession {
    fs: f64,
    bpm: f64,
    amplitude: f64,
    noise: f64,
    rng: StdRng,
    frame_index: usize,
}

impl SyntheticSession {
    pub fn new(fs: f64, bpm: f64, amplitude: f64, noise: f64, seed: u64) -> Self {
        Self {
            fs,
            bpm,
            amplitude,
            noise,
            rng: StdRng::seed_from_u64(seed),
            frame_index: 0,
        }
    }

    /// Pixel buffer and capture timestamp of the next frame.
    pub fn next_frame(&mut self) -> (Vec<u8>, f64) {
        let t = self.frame_index as f64 / self.fs;
        self.frame_index += 1;

        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        let level = 128.0 + self.amplitude * (TAU * self.bpm / 60.0 * t).sin() + jitter;
        let g = level.round().clamp(0.0, 255.0) as u8;

        let mut pixels = Vec::with_capacity(FRAME_SIZE * FRAME_SIZE * 3);
        for _ in 0..FRAME_SIZE * FRAME_SIZE {
            pixels.extend_from_slice(&[90, g, 70]);
        }
        (pixels, t)
    }
}
