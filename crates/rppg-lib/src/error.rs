use crate::frame::ColorFormat;
use thiserror::Error;

/// Errors surfaced by the pulse-extraction pipeline.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Declared color format and actual channel layout disagree. The sampler
    /// refuses to guess rather than read the wrong channel.
    #[error("unsupported color format {format:?} for {channels}-channel pixel data")]
    UnsupportedFormat {
        format: ColorFormat,
        channels: usize,
    },
    /// A frame with no pixels; the histogram centroid would be 0/0.
    #[error("frame contains no pixels")]
    EmptyFrame,
    /// Not enough buffered samples to derive the requested quantity.
    #[error("not enough samples recorded")]
    InsufficientData,
    /// Fewer than two pulse peaks in the window, so no RR interval exists.
    #[error("found {found} pulse peaks, at least 2 required")]
    InsufficientPeaks { found: usize },
    /// Estimator variant that is reserved but has no implementation.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}
