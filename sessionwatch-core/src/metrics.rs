//! Metric primitives shared by the session, global, and performance monitors
//!
//! These are stateless aggregation helpers with no knowledge of domain
//! types: saturating counters, peak-tracking gauges, count-windowed timing
//! accumulators, and display formatting.

use crate::history::BoundedHistory;

/// A monotonically increasing, saturating counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    value: u64,
}

impl Counter {
    /// Creates a counter starting at zero
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Increments by one
    pub const fn incr(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    /// Adds `n` to the counter
    pub const fn add(&mut self, n: u64) {
        self.value = self.value.saturating_add(n);
    }

    /// Returns the current value
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.value
    }
}

/// A settable value that also remembers its peak
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gauge {
    value: f64,
    peak: f64,
}

impl Gauge {
    /// Creates a gauge at zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: 0.0,
            peak: 0.0,
        }
    }

    /// Sets the current value, updating the peak if exceeded
    pub fn set(&mut self, value: f64) {
        self.value = value;
        if value > self.peak {
            self.peak = value;
        }
    }

    /// Returns the current value
    #[must_use]
    pub const fn get(&self) -> f64 {
        self.value
    }

    /// Returns the highest value ever set
    #[must_use]
    pub const fn peak(&self) -> f64 {
        self.peak
    }
}

/// A rolling window of duration samples in seconds.
///
/// The window is count-based (last N samples, oldest evicted) with no time
/// decay; the mean is the arithmetic mean of the retained samples.
#[derive(Debug, Clone)]
pub struct TimingWindow {
    samples: BoundedHistory<f64>,
}

impl TimingWindow {
    /// Creates a window retaining at most `capacity` samples
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: BoundedHistory::new(capacity),
        }
    }

    /// Records a duration sample in seconds
    pub fn record(&mut self, secs: f64) {
        self.samples.append(secs);
    }

    /// Returns the arithmetic mean of retained samples, or 0.0 when empty
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self.samples.iter().sum();
        total / self.samples.len() as f64
    }

    /// Returns the largest retained sample, or 0.0 when empty
    #[must_use]
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }

    /// Returns the number of retained samples
    #[must_use]
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

/// A units-per-second rate derived from a running total.
///
/// Backed by a peak-tracking [`Gauge`]. The caller recomputes the rate
/// against an elapsed-time measurement of its choosing (typically session
/// uptime), so the meter itself holds no clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateMeter {
    inner: Gauge,
}

impl RateMeter {
    /// Creates a meter at zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Gauge::new(),
        }
    }

    /// Recomputes the rate from a running total and elapsed seconds.
    ///
    /// Non-positive elapsed time leaves the rate unchanged.
    pub fn update(&mut self, total: u64, elapsed_secs: f64) {
        if elapsed_secs <= 0.0 {
            return;
        }
        self.inner.set(total as f64 / elapsed_secs);
    }

    /// Returns the most recently computed rate, units per second
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.inner.get()
    }

    /// Returns the highest rate ever computed
    #[must_use]
    pub const fn peak(&self) -> f64 {
        self.inner.peak()
    }
}

/// Formats a byte count as a human-readable string
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a duration in seconds as a human-readable string
#[must_use]
pub fn format_duration_secs(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if secs < 1.0 && secs > 0.0 {
        format!("{:.0} ms", secs * 1000.0)
    } else {
        format!("{seconds}s")
    }
}
