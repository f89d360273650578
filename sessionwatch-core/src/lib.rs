//! `SessionWatch` Core Library
//!
//! Client-side telemetry and health scoring for remote-session activity.
//! The engine observes operation lifecycles, commands, and transfer volume
//! across sessions, keeps bounded in-memory histories, and periodically
//! condenses them into aggregated metrics, a weighted health score, and a
//! performance report.
//!
//! # Crate Structure
//!
//! - [`history`] - Fixed-capacity FIFO history buffer
//! - [`metrics`] - Counters, gauges, timing windows, formatting helpers
//! - [`operation`] - Operation lifecycle types and error records
//! - [`command`] - Heuristic shell-command classification
//! - [`session`] - Per-session monitors and summaries
//! - [`global`] - Cross-session operation tracking
//! - [`perf`] - Performance spans, bottlenecks, scoring
//! - [`coordinator`] - The monitoring root: fan-out, cycles, health, anomalies
//! - [`events`] - Broadcast event fan-out
//! - [`settings`] - Engine configuration
//! - [`export`] - Versioned JSON diagnostic export
//!
//! All state is process-local and in-memory; nothing is persisted and no
//! network I/O is performed.

#![warn(missing_docs)]

pub mod command;
pub mod coordinator;
pub mod events;
pub mod export;
pub mod global;
pub mod history;
pub mod metrics;
pub mod operation;
pub mod perf;
pub mod session;
pub mod settings;

// =============================================================================
// Convenience re-exports
//
// Flat re-exports for tests and downstream callers; new code may prefer the
// modular paths (e.g. `sessionwatch_core::session::SessionMonitor`).
// =============================================================================

pub use command::{
    CommandClassifier, CommandForm, ParsedCommand, ShellCommandClassifier,
};
pub use coordinator::{
    ActiveOperationStatus, AggregatedMetrics, Anomaly, AnomalyDetector, AnomalyKind, HealthStatus,
    MonitoringCoordinator, RealtimeStatus, SessionStatus, SubstringAnomalyDetector,
    overall_health_score,
};
pub use events::{Alert, AlertSeverity, EVENT_CHANNEL_CAPACITY, MonitorEvent};
pub use export::{EXPORT_FORMAT_VERSION, ExportError, ExportResult, MetricsExport};
pub use global::{GlobalOperationMonitor, GlobalStats};
pub use history::BoundedHistory;
pub use metrics::{Counter, Gauge, RateMeter, TimingWindow, format_bytes, format_duration_secs};
pub use operation::{CompletedOperation, ErrorRecord, Operation, OperationKind};
pub use perf::{
    Bottleneck, BottleneckSeverity, PerformanceMeasurement, PerformanceReport, PerformanceSpan,
    PerformanceTracker, SpanLog, SpanStatus,
};
pub use session::{CommandRecord, SessionMonitor, SessionSummary, SlowOperation};
pub use settings::MonitorSettings;
