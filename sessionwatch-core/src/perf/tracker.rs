//! Span lifecycle tracking, bottleneck detection, and scoring

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::BoundedHistory;
use crate::settings::MonitorSettings;

use super::span::{Bottleneck, PerformanceSpan, SpanStatus};

/// Closure measurements retained by the tracker
const MEASUREMENT_CAPACITY: usize = 100;

/// Points deducted per span still in progress past the slow threshold
const LONG_RUNNING_PENALTY: u32 = 5;

/// A best-effort measurement of one closure run under [`PerformanceTracker::measure`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeasurement {
    /// Name of the measured operation
    pub operation: String,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
    /// Approximate CPU time in seconds. Without per-thread accounting this
    /// is estimated as the wall-clock duration.
    pub cpu_time_secs: f64,
    /// Net memory change in bytes, best-effort (0 when unavailable)
    pub memory_delta_bytes: i64,
    /// Peak memory in bytes, best-effort (0 when unavailable)
    pub peak_memory_bytes: u64,
    /// Whether the closure returned `Ok`
    pub succeeded: bool,
    /// When the measurement finished
    pub measured_at: DateTime<Utc>,
}

/// Tracks spans, detects bottlenecks, and scores overall performance
pub struct PerformanceTracker {
    spans: HashMap<Uuid, PerformanceSpan>,
    bottlenecks: BoundedHistory<Bottleneck>,
    measurements: BoundedHistory<PerformanceMeasurement>,
    slow_span_threshold_secs: f64,
}

impl PerformanceTracker {
    /// Creates a tracker with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(&MonitorSettings::default())
    }

    /// Creates a tracker with explicit retention and threshold settings
    #[must_use]
    pub fn with_settings(settings: &MonitorSettings) -> Self {
        Self {
            spans: HashMap::new(),
            bottlenecks: BoundedHistory::new(settings.bottleneck_history),
            measurements: BoundedHistory::new(MEASUREMENT_CAPACITY),
            slow_span_threshold_secs: settings.slow_span_threshold_secs,
        }
    }

    /// Starts a new span and returns its id
    pub fn start_span(&mut self, name: impl Into<String>, parent: Option<Uuid>) -> Uuid {
        let span = PerformanceSpan::new(name, parent);
        let id = span.id;
        self.spans.insert(id, span);
        id
    }

    /// Attaches a tag to an active span; unknown ids are ignored
    pub fn span_tag(&mut self, id: Uuid, key: impl Into<String>, value: impl Into<String>) {
        if let Some(span) = self.spans.get_mut(&id) {
            span.tag(key, value);
        }
    }

    /// Appends a log line to an active span; unknown ids are ignored
    pub fn span_log(&mut self, id: Uuid, message: impl Into<String>) {
        if let Some(span) = self.spans.get_mut(&id) {
            span.log(message);
        }
    }

    /// Finishes a span, measuring its duration since start.
    ///
    /// Unknown ids produce a warning and no other effect.
    pub fn complete_span(&mut self, id: Uuid, status: SpanStatus) {
        let Some(elapsed) = self.spans.get(&id).map(PerformanceSpan::elapsed_secs) else {
            tracing::warn!(span = %id, "Ignoring completion for unknown span");
            return;
        };
        self.complete_span_with_duration(id, status, elapsed);
    }

    /// Finishes a span with an explicit duration in seconds.
    ///
    /// Terminal completion removes the span from the tracker; only the
    /// bottleneck record (when slow) outlives it. Non-terminal statuses
    /// leave the span running.
    pub fn complete_span_with_duration(&mut self, id: Uuid, status: SpanStatus, duration_secs: f64) {
        if !status.is_terminal() {
            return;
        }
        let Some(mut span) = self.spans.remove(&id) else {
            tracing::warn!(span = %id, "Ignoring completion for unknown span");
            return;
        };
        span.finish_with_duration(status, duration_secs);
        if duration_secs > self.slow_span_threshold_secs {
            self.identify_bottleneck(id, &span.name, duration_secs);
        }
    }

    /// Records a bottleneck for a slow operation
    pub fn identify_bottleneck(&mut self, span_id: Uuid, operation: &str, duration_secs: f64) {
        let bottleneck = Bottleneck::detect(span_id, operation, duration_secs);
        tracing::debug!(
            operation = %bottleneck.operation,
            severity = %bottleneck.severity,
            duration_secs = bottleneck.duration_secs,
            "Bottleneck detected"
        );
        self.bottlenecks.append(bottleneck);
    }

    /// Runs a fallible closure inside a span, recording a measurement
    /// whether or not it fails. Errors are returned unchanged.
    pub fn measure<T, E>(
        &mut self,
        name: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let id = self.start_span(name, None);
        let started = Instant::now();
        let result = f();
        self.finish_measurement(id, name, started.elapsed(), result.is_ok());
        result
    }

    /// Records the outcome of a measured closure: finishes its span and
    /// appends a [`PerformanceMeasurement`]. Callers that run the closure
    /// elsewhere time it themselves and report back through this.
    pub fn finish_measurement(&mut self, id: Uuid, name: &str, duration: Duration, succeeded: bool) {
        let duration_secs = duration.as_secs_f64();
        let status = if succeeded {
            SpanStatus::Completed
        } else {
            SpanStatus::Failed
        };
        self.complete_span_with_duration(id, status, duration_secs);
        self.measurements.append(PerformanceMeasurement {
            operation: name.to_string(),
            duration_secs,
            cpu_time_secs: duration_secs,
            memory_delta_bytes: 0,
            peak_memory_bytes: 0,
            succeeded,
            measured_at: Utc::now(),
        });
    }

    /// Retained bottlenecks, most severe first
    #[must_use]
    pub fn bottlenecks(&self) -> Vec<Bottleneck> {
        let mut all = self.bottlenecks.snapshot();
        all.sort_by(|a, b| b.severity.cmp(&a.severity));
        all
    }

    /// Retained closure measurements, oldest-first
    #[must_use]
    pub fn measurements(&self) -> Vec<PerformanceMeasurement> {
        self.measurements.snapshot()
    }

    /// Number of spans not yet finished
    #[must_use]
    pub fn active_span_count(&self) -> usize {
        self.spans.len()
    }

    /// Overall performance score in [0, 100].
    ///
    /// Starts at 100, deducts per-bottleneck penalties by severity, and
    /// 5 points per span still in progress past the slow threshold.
    #[must_use]
    pub fn performance_score(&self) -> u32 {
        let bottleneck_penalty: u32 = self
            .bottlenecks
            .iter()
            .map(|b| b.severity.score_penalty())
            .sum();
        let long_running = self
            .spans
            .values()
            .filter(|s| s.elapsed_secs() > self.slow_span_threshold_secs)
            .count() as u32;
        100u32
            .saturating_sub(bottleneck_penalty)
            .saturating_sub(long_running * LONG_RUNNING_PENALTY)
    }

    /// Builds a serializable report of current performance state
    #[must_use]
    pub fn report(&self) -> PerformanceReport {
        PerformanceReport {
            score: self.performance_score(),
            active_spans: self.active_span_count(),
            bottlenecks: self.bottlenecks(),
            measurements: self.measurements(),
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceTracker")
            .field("spans", &self.spans.len())
            .field("bottlenecks", &self.bottlenecks.len())
            .finish_non_exhaustive()
    }
}

/// Serializable performance snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Score in [0, 100]
    pub score: u32,
    /// Spans still in progress
    pub active_spans: usize,
    /// Detected bottlenecks, most severe first
    pub bottlenecks: Vec<Bottleneck>,
    /// Closure measurements, oldest-first
    pub measurements: Vec<PerformanceMeasurement>,
}
