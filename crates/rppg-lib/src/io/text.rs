use anyhow::{Context, Result};
use std::path::Path;

/// A sample series read from text: one sample per line, either `value` or
/// `timestamp value` (whitespace separated). Blank lines and `#` comments are
/// skipped. Timestamps are all-or-nothing; mixing the two layouts is an
/// error.
#[derive(Debug, Clone)]
pub struct TimedSeries {
    pub times: Option<Vec<f64>>,
    pub values: Vec<f64>,
}

impl TimedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Per-sample timestamps: the explicit column when present, otherwise
    /// synthesized at a fixed rate.
    pub fn timestamps(&self, fs: f64) -> Vec<f64> {
        match &self.times {
            Some(times) => times.clone(),
            None => (0..self.values.len()).map(|i| i as f64 / fs).collect(),
        }
    }

    /// Effective sampling rate: derived from explicit timestamps when
    /// present, otherwise the fallback.
    pub fn sampling_rate(&self, fallback_fs: f64) -> f64 {
        match &self.times {
            Some(times) if times.len() >= 2 => {
                let span = times[times.len() - 1] - times[0];
                if span > 0.0 {
                    (times.len() - 1) as f64 / span
                } else {
                    fallback_fs
                }
            }
            _ => fallback_fs,
        }
    }
}

/// Parse a newline-delimited sample series.
pub fn parse_series(text: &str) -> Result<TimedSeries> {
    let mut times = Vec::new();
    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parse = |field: &str| -> Result<f64> {
            field
                .parse()
                .with_context(|| format!("line {}: not a number: {}", idx + 1, trimmed))
        };
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match fields.as_slice() {
            [value] => values.push(parse(value)?),
            [time, value] => {
                times.push(parse(time)?);
                values.push(parse(value)?);
            }
            _ => anyhow::bail!("line {}: expected 1 or 2 columns: {}", idx + 1, trimmed),
        }
    }
    if values.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    if !times.is_empty() && times.len() != values.len() {
        anyhow::bail!(
            "mixed layouts: {} timestamped lines out of {}",
            times.len(),
            values.len()
        );
    }
    Ok(TimedSeries {
        times: if times.is_empty() { None } else { Some(times) },
        values,
    })
}

/// Read a sample series from disk.
pub fn read_series(path: &Path) -> Result<TimedSeries> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_series(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_values() {
        let series = parse_series("# comment\n1.0\n2.5\n\n3.0\n").unwrap();
        assert!(series.times.is_none());
        assert_eq!(series.values, vec![1.0, 2.5, 3.0]);
        assert_eq!(series.timestamps(10.0), vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn parses_timestamped_values() {
        let series = parse_series("0.0 101.0\n0.5 102.0\n1.0 103.0\n").unwrap();
        assert_eq!(series.times.as_deref(), Some(&[0.0, 0.5, 1.0][..]));
        assert!((series.sampling_rate(30.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_mixed_layouts() {
        assert!(parse_series("1.0\n0.5 2.0\n").is_err());
    }

    #[test]
    fn rejects_garbage_and_empty_input() {
        assert!(parse_series("abc\n").is_err());
        assert!(parse_series("# nothing\n").is_err());
    }
}
