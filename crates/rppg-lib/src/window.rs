use std::collections::VecDeque;

/// Bounded FIFO of timestamped scalar samples. Pushing at capacity evicts the
/// oldest entry; duration, mean sampling interval and sample statistics are
/// recomputed after every push so readers never see stale numbers.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    capacity: usize,
    times: VecDeque<f64>,
    values: VecDeque<f64>,
    duration: f64,
    mean_interval: f64,
    mean: f64,
    stddev: f64,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            times: VecDeque::with_capacity(capacity),
            values: VecDeque::with_capacity(capacity),
            duration: 0.0,
            mean_interval: f64::INFINITY,
            mean: 0.0,
            stddev: 0.0,
        }
    }

    pub fn push(&mut self, timestamp: f64, value: f64) {
        if self.times.len() == self.capacity {
            self.times.pop_front();
            self.values.pop_front();
        }
        self.times.push_back(timestamp);
        self.values.push_back(value);
        self.recompute();
    }

    fn recompute(&mut self) {
        let n = self.values.len();
        if n < 2 {
            // Expected transient while the window fills; report sentinels
            // rather than failing.
            self.duration = 0.0;
            self.mean_interval = f64::INFINITY;
            self.mean = self.values.front().copied().unwrap_or(0.0);
            self.stddev = 0.0;
            return;
        }
        let first = *self.times.front().unwrap();
        let last = *self.times.back().unwrap();
        self.duration = last - first;
        self.mean_interval = self.duration / (n - 1) as f64;

        self.mean = self.values.iter().sum::<f64>() / n as f64;
        let var = self
            .values
            .iter()
            .map(|v| (v - self.mean).powi(2))
            .sum::<f64>()
            / n as f64;
        self.stddev = var.sqrt();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest minus oldest timestamp; 0 below two samples.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Mean of consecutive timestamp deltas; infinite below two samples.
    pub fn mean_interval(&self) -> f64 {
        self.mean_interval
    }

    /// Effective sampling rate in Hz; 0 while the interval is undefined.
    pub fn mean_rate(&self) -> f64 {
        if self.mean_interval.is_finite() && self.mean_interval > 0.0 {
            1.0 / self.mean_interval
        } else {
            0.0
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.times.iter().copied().collect()
    }

    /// Values whose timestamps fall within `seconds` of the newest sample.
    pub fn tail(&self, seconds: f64) -> Vec<f64> {
        let Some(&last) = self.times.back() else {
            return Vec::new();
        };
        self.times
            .iter()
            .zip(self.values.iter())
            .filter(|(&t, _)| last - t <= seconds)
            .map(|(_, &v)| v)
            .collect()
    }

    /// Recorded duration of the trailing `seconds` slice.
    pub fn tail_duration(&self, seconds: f64) -> f64 {
        let Some(&last) = self.times.back() else {
            return 0.0;
        };
        let first = self
            .times
            .iter()
            .copied()
            .find(|&t| last - t <= seconds)
            .unwrap_or(last);
        last - first
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
        self.duration = 0.0;
        self.mean_interval = f64::INFINITY;
        self.mean = 0.0;
        self.stddev = 0.0;
    }
}

/// Bounded FIFO of per-frame validity flags, one per sample.
#[derive(Debug, Clone)]
pub struct FlagWindow {
    capacity: usize,
    flags: VecDeque<bool>,
}

impl FlagWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            flags: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, flag: bool) {
        if self.flags.len() == self.capacity {
            self.flags.pop_front();
        }
        self.flags.push_back(flag);
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.flags.len() == self.capacity
    }

    /// Full window with every flag set. The readiness check wants presence
    /// over the whole recording, not just the most recent frames.
    pub fn all_set(&self) -> bool {
        self.is_full() && self.flags.iter().all(|&f| f)
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }
}
