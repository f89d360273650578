//! Performance span tracking and bottleneck detection
//!
//! Spans are timed units of work (optionally nested) tracked by a
//! [`PerformanceTracker`]. Spans that finish over the slow threshold become
//! [`Bottleneck`] records with heuristic suggestions, and the tracker
//! condenses everything into a single score in [0, 100].

mod span;
mod tracker;

pub use span::{Bottleneck, BottleneckSeverity, PerformanceSpan, SpanLog, SpanStatus};
pub use tracker::{PerformanceMeasurement, PerformanceReport, PerformanceTracker};
