use crate::error::PulseError;
use serde::{Deserialize, Serialize};

/// Intensity histogram resolution for 8-bit channels.
pub const HISTOGRAM_BINS: usize = 256;

/// Channel order of interleaved 8-bit pixel data. The auto-alpha variants
/// defer the alpha question to the frame's actual channel count, which is how
/// camera pipelines that sometimes hand over RGBA surfaces are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFormat {
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    RgbAutoAlpha,
    BgrAutoAlpha,
}

/// Color channel to sample, independent of storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Red,
    /// Hemoglobin absorbs green light most strongly; this is the PPG default.
    Green,
    Blue,
}

impl ColorFormat {
    /// Pin the format down to a concrete layout given the actual channel
    /// count. Anything other than 3 or 4 channels, or an explicit format
    /// whose channel count disagrees with the data, is rejected.
    pub fn resolve(self, channels: usize) -> Result<ColorFormat, PulseError> {
        match (self, channels) {
            (ColorFormat::Rgb, 3) | (ColorFormat::RgbAutoAlpha, 3) => Ok(ColorFormat::Rgb),
            (ColorFormat::Bgr, 3) | (ColorFormat::BgrAutoAlpha, 3) => Ok(ColorFormat::Bgr),
            (ColorFormat::Rgba, 4) | (ColorFormat::RgbAutoAlpha, 4) => Ok(ColorFormat::Rgba),
            (ColorFormat::Bgra, 4) | (ColorFormat::BgrAutoAlpha, 4) => Ok(ColorFormat::Bgra),
            (format, channels) => Err(PulseError::UnsupportedFormat { format, channels }),
        }
    }

    /// Bytes per pixel for concrete formats; auto-alpha has none yet.
    pub fn channel_count(self) -> Option<usize> {
        match self {
            ColorFormat::Rgb | ColorFormat::Bgr => Some(3),
            ColorFormat::Rgba | ColorFormat::Bgra => Some(4),
            ColorFormat::RgbAutoAlpha | ColorFormat::BgrAutoAlpha => None,
        }
    }

    fn is_rgb_order(self) -> bool {
        matches!(
            self,
            ColorFormat::Rgb | ColorFormat::Rgba | ColorFormat::RgbAutoAlpha
        )
    }

    /// Index of a color channel within one interleaved pixel.
    pub fn channel_index(self, channel: Channel) -> usize {
        match channel {
            Channel::Green => 1,
            Channel::Red if self.is_rgb_order() => 0,
            Channel::Red => 2,
            Channel::Blue if self.is_rgb_order() => 2,
            Channel::Blue => 0,
        }
    }
}

/// One video frame: borrowed interleaved 8-bit pixels plus a resolved layout.
///
/// Construction validates the declared format against the data, so every
/// `Frame` that exists can be sampled safely.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pixels: &'a [u8],
    width: usize,
    height: usize,
    format: ColorFormat,
    channels: usize,
}

impl<'a> Frame<'a> {
    pub fn new(
        pixels: &'a [u8],
        width: usize,
        height: usize,
        format: ColorFormat,
    ) -> Result<Self, PulseError> {
        let pixel_count = width * height;
        if pixel_count == 0 || pixels.is_empty() {
            return Err(PulseError::EmptyFrame);
        }
        if pixels.len() % pixel_count != 0 {
            return Err(PulseError::UnsupportedFormat {
                format,
                channels: 0,
            });
        }
        let channels = pixels.len() / pixel_count;
        if let Some(declared) = format.channel_count() {
            if declared != channels {
                return Err(PulseError::UnsupportedFormat { format, channels });
            }
        }
        let format = format.resolve(channels)?;
        Ok(Self {
            pixels,
            width,
            height,
            format,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resolved, concrete color format.
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// 256-bin intensity histogram of one color channel.
    pub fn histogram(&self, channel: Channel) -> [u32; HISTOGRAM_BINS] {
        let idx = self.format.channel_index(channel);
        let mut hist = [0u32; HISTOGRAM_BINS];
        for pixel in self.pixels.chunks_exact(self.channels) {
            hist[pixel[idx] as usize] += 1;
        }
        hist
    }

    /// Intensity-weighted centroid of the channel histogram, the per-frame
    /// scalar PPG sample. Bins are numbered 1..=256, so the result lies in
    /// [1, 256].
    pub fn centroid(&self, channel: Channel) -> Result<f64, PulseError> {
        let hist = self.histogram(channel);
        let mut total = 0.0;
        let mut weighted = 0.0;
        for (bin, &count) in hist.iter().enumerate() {
            total += count as f64;
            weighted += (bin + 1) as f64 * count as f64;
        }
        if total == 0.0 {
            return Err(PulseError::EmptyFrame);
        }
        Ok(weighted / total)
    }

    /// Grayscale conversion with the usual ITU-R BT.601 weights.
    pub fn luma(&self) -> Vec<f64> {
        let r = self.format.channel_index(Channel::Red);
        let g = self.format.channel_index(Channel::Green);
        let b = self.format.channel_index(Channel::Blue);
        self.pixels
            .chunks_exact(self.channels)
            .map(|p| 0.299 * p[r] as f64 + 0.587 * p[g] as f64 + 0.114 * p[b] as f64)
            .collect()
    }

    /// Image sharpness as the standard deviation of the Laplacian over the
    /// grayscale frame. A finger pressed flat on the lens blurs everything
    /// and scores near zero; an uncovered scene keeps its edges and scores
    /// high. The presence gate relies on that inversion.
    pub fn sharpness(&self) -> f64 {
        let luma = self.luma();
        let (w, h) = (self.width, self.height);
        if w < 3 || h < 3 {
            return 0.0;
        }
        let mut responses = Vec::with_capacity((w - 2) * (h - 2));
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let center = luma[y * w + x];
                let lap = luma[(y - 1) * w + x] + luma[(y + 1) * w + x] + luma[y * w + x - 1]
                    + luma[y * w + x + 1]
                    - 4.0 * center;
                responses.push(lap);
            }
        }
        let n = responses.len() as f64;
        let mean = responses.iter().sum::<f64>() / n;
        let var = responses.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        var.sqrt()
    }
}
