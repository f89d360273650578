//! Metrics monitor for a single remote session

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::{CommandClassifier, ParsedCommand, ShellCommandClassifier};
use crate::history::BoundedHistory;
use crate::metrics::{Counter, RateMeter, TimingWindow, format_bytes, format_duration_secs};
use crate::operation::{ErrorRecord, Operation, OperationKind};
use crate::settings::MonitorSettings;

/// Error-rate above which a session is considered unhealthy
const HEALTHY_ERROR_RATE_LIMIT: f64 = 0.1;

/// Average latency (seconds) above which a session is considered unhealthy
const HEALTHY_LATENCY_LIMIT_SECS: f64 = 2.0;

/// A raw command line together with its normalized classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// The command exactly as issued
    pub raw: String,
    /// Normalized base token and structural form
    pub parsed: ParsedCommand,
    /// When the command was issued
    pub issued_at: DateTime<Utc>,
}

/// A completed operation whose duration exceeded the slow threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowOperation {
    /// Operation id
    pub id: Uuid,
    /// What kind of work it was
    pub kind: OperationKind,
    /// Measured duration in seconds
    pub duration_secs: f64,
    /// When the operation completed
    pub completed_at: DateTime<Utc>,
}

/// Tracks all metrics for one active remote session.
///
/// Counters reflect operations *started*, not just completed; the error
/// rate and latency derive only from completed operations.
pub struct SessionMonitor {
    session_id: String,
    host: String,
    port: u16,
    connected_at: DateTime<Utc>,
    disconnected_at: Option<DateTime<Utc>>,
    started: Instant,
    is_active: bool,
    total_uptime: Duration,
    active_ops: HashMap<Uuid, Operation>,
    total_commands: Counter,
    total_file_transfers: Counter,
    total_port_forwards: Counter,
    authentication_attempts: Counter,
    total_errors: Counter,
    bytes_transferred: Counter,
    completed_ok: u64,
    completed_err: u64,
    error_rate: f64,
    latency: TimingWindow,
    average_latency: f64,
    throughput: RateMeter,
    peak_concurrent_operations: usize,
    command_frequency: BTreeMap<String, u64>,
    command_history: BoundedHistory<CommandRecord>,
    slow_operations: BoundedHistory<SlowOperation>,
    recent_errors: BoundedHistory<ErrorRecord>,
    classifier: Arc<dyn CommandClassifier>,
    slow_threshold_secs: f64,
    idle_threshold_secs: i64,
    last_activity: DateTime<Utc>,
    is_idle: bool,
}

impl SessionMonitor {
    /// Creates a monitor for a newly opened session using default settings
    #[must_use]
    pub fn new(session_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::with_settings(
            session_id,
            host,
            port,
            &MonitorSettings::default(),
            Arc::new(ShellCommandClassifier::new()),
        )
    }

    /// Creates a monitor with explicit settings and command classifier
    #[must_use]
    pub fn with_settings(
        session_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        settings: &MonitorSettings,
        classifier: Arc<dyn CommandClassifier>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            host: host.into(),
            port,
            connected_at: now,
            disconnected_at: None,
            started: Instant::now(),
            is_active: true,
            total_uptime: Duration::ZERO,
            active_ops: HashMap::new(),
            total_commands: Counter::new(),
            total_file_transfers: Counter::new(),
            total_port_forwards: Counter::new(),
            authentication_attempts: Counter::new(),
            total_errors: Counter::new(),
            bytes_transferred: Counter::new(),
            completed_ok: 0,
            completed_err: 0,
            error_rate: 0.0,
            latency: TimingWindow::new(settings.latency_window),
            average_latency: 0.0,
            throughput: RateMeter::new(),
            peak_concurrent_operations: 0,
            command_frequency: BTreeMap::new(),
            command_history: BoundedHistory::new(settings.command_history),
            slow_operations: BoundedHistory::new(settings.slow_operation_history),
            recent_errors: BoundedHistory::new(settings.recent_error_history),
            classifier,
            slow_threshold_secs: settings.slow_operation_threshold_secs,
            idle_threshold_secs: i64::from(settings.idle_threshold_secs),
            last_activity: now,
            is_idle: false,
        }
    }

    /// Session id this monitor tracks
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Target host of the session
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port of the session
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the session is still being monitored
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Resumes monitoring after a `stop()`. Uptime accumulation restarts
    /// from now; the frozen uptime is kept as the accumulated base.
    pub fn start(&mut self) {
        if self.is_active {
            return;
        }
        self.is_active = true;
        self.disconnected_at = None;
        self.started = Instant::now();
        self.last_activity = Utc::now();
    }

    /// Stops monitoring and freezes `total_uptime`. Idempotent.
    pub fn stop(&mut self) {
        if !self.is_active {
            return;
        }
        self.is_active = false;
        self.total_uptime += self.started.elapsed();
        self.disconnected_at = Some(Utc::now());
    }

    /// Total monitored uptime; live while active, frozen after `stop()`
    #[must_use]
    pub fn uptime(&self) -> Duration {
        if self.is_active {
            self.total_uptime + self.started.elapsed()
        } else {
            self.total_uptime
        }
    }

    /// Registers an active operation and increments the matching
    /// started-counter immediately
    pub fn track_operation(
        &mut self,
        id: Uuid,
        kind: OperationKind,
        metadata: BTreeMap<String, String>,
    ) {
        match kind {
            OperationKind::Command => self.total_commands.incr(),
            OperationKind::FileTransfer => self.total_file_transfers.incr(),
            OperationKind::PortForward => self.total_port_forwards.incr(),
            OperationKind::Authenticate => self.authentication_attempts.incr(),
            OperationKind::Connect | OperationKind::Other => {}
        }
        let op = Operation::with_id(id, kind, self.host.clone(), self.port).with_metadata(metadata);
        self.active_ops.insert(id, op);
        if self.active_ops.len() > self.peak_concurrent_operations {
            self.peak_concurrent_operations = self.active_ops.len();
        }
        self.last_activity = Utc::now();
    }

    /// Completes a tracked operation, measuring the duration since tracking.
    ///
    /// An unknown id is a silent no-op.
    pub fn complete_operation(&mut self, id: Uuid, success: bool) {
        let Some(elapsed) = self.active_ops.get(&id).map(Operation::elapsed) else {
            tracing::debug!(session = %self.session_id, operation = %id,
                "Ignoring completion for untracked operation");
            return;
        };
        self.complete_operation_with_duration(id, success, elapsed);
    }

    /// Completes a tracked operation with an explicit measured duration
    pub fn complete_operation_with_duration(&mut self, id: Uuid, success: bool, duration: Duration) {
        let Some(op) = self.active_ops.remove(&id) else {
            tracing::debug!(session = %self.session_id, operation = %id,
                "Ignoring completion for untracked operation");
            return;
        };

        if success {
            self.completed_ok += 1;
        } else {
            self.completed_err += 1;
            self.total_errors.incr();
        }
        let completed = self.completed_ok + self.completed_err;
        self.error_rate = self.completed_err as f64 / completed as f64;

        let secs = duration.as_secs_f64();
        self.latency.record(secs);
        self.average_latency = self.latency.mean();

        if secs > self.slow_threshold_secs {
            self.slow_operations.append(SlowOperation {
                id,
                kind: op.kind,
                duration_secs: secs,
                completed_at: Utc::now(),
            });
        }
        self.last_activity = Utc::now();
    }

    /// Records a raw command line for frequency counting and history
    pub fn track_command(&mut self, raw: &str) {
        let parsed = self.classifier.classify(raw);
        if !parsed.base.is_empty() {
            *self.command_frequency.entry(parsed.base.clone()).or_insert(0) += 1;
        }
        self.command_history.append(CommandRecord {
            raw: raw.to_string(),
            parsed,
            issued_at: Utc::now(),
        });
        self.last_activity = Utc::now();
    }

    /// Adds to the session's transferred byte counter
    pub fn track_bytes_transferred(&mut self, bytes: u64) {
        self.bytes_transferred.add(bytes);
        self.last_activity = Utc::now();
    }

    /// Records an error against this session
    pub fn track_error(&mut self, message: &str, operation: &str) {
        self.total_errors.incr();
        self.recent_errors.append(ErrorRecord::new(message, operation));
        self.last_activity = Utc::now();
    }

    /// Healthy means low error rate and low average latency. Derived,
    /// never stored.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.error_rate < HEALTHY_ERROR_RATE_LIMIT
            && self.average_latency < HEALTHY_LATENCY_LIMIT_SECS
    }

    /// Recomputes idle state and throughput.
    ///
    /// Called from the coordinator's aggregation cycle rather than on every
    /// mutation, so idle detection lags by at most one cycle.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.is_idle =
            (now - self.last_activity).num_seconds() > self.idle_threshold_secs;
        self.throughput
            .update(self.bytes_transferred.get(), self.uptime().as_secs_f64());
    }

    /// Fraction of completed operations that failed, in [0, 1]
    #[must_use]
    pub const fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Mean of the retained latency samples, in seconds
    #[must_use]
    pub const fn average_latency(&self) -> f64 {
        self.average_latency
    }

    /// Whether the session has been inactive past the idle threshold
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.is_idle
    }

    /// Number of currently active operations
    #[must_use]
    pub fn active_operation_count(&self) -> usize {
        self.active_ops.len()
    }

    /// Commands started on this session
    #[must_use]
    pub const fn total_commands(&self) -> u64 {
        self.total_commands.get()
    }

    /// Errors recorded on this session
    #[must_use]
    pub const fn total_errors(&self) -> u64 {
        self.total_errors.get()
    }

    /// Bytes transferred over this session
    #[must_use]
    pub const fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.get()
    }

    /// Per-base-token command counts
    #[must_use]
    pub const fn command_frequency(&self) -> &BTreeMap<String, u64> {
        &self.command_frequency
    }

    /// Recently issued commands, oldest-first
    #[must_use]
    pub fn command_history(&self) -> Vec<CommandRecord> {
        self.command_history.snapshot()
    }

    /// Builds a serializable snapshot of the session's current state.
    ///
    /// The snapshot taken immediately before removal is the session's
    /// terminal archive record.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            host: self.host.clone(),
            port: self.port,
            connected_at: self.connected_at,
            disconnected_at: self.disconnected_at,
            total_uptime_secs: self.uptime().as_secs_f64(),
            total_commands: self.total_commands.get(),
            total_file_transfers: self.total_file_transfers.get(),
            total_port_forwards: self.total_port_forwards.get(),
            authentication_attempts: self.authentication_attempts.get(),
            total_errors: self.total_errors.get(),
            bytes_transferred: self.bytes_transferred.get(),
            error_rate: self.error_rate,
            average_latency_secs: self.average_latency,
            throughput_bytes_per_sec: self.throughput.rate(),
            peak_throughput_bytes_per_sec: self.throughput.peak(),
            peak_concurrent_operations: self.peak_concurrent_operations,
            active_operations: self.active_ops.len(),
            command_frequency: self.command_frequency.clone(),
            slow_operations: self.slow_operations.snapshot(),
            recent_errors: self.recent_errors.snapshot(),
            is_idle: self.is_idle,
            is_healthy: self.is_healthy(),
        }
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("session_id", &self.session_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("is_active", &self.is_active)
            .field("active_ops", &self.active_ops.len())
            .field("error_rate", &self.error_rate)
            .finish_non_exhaustive()
    }
}

/// Read-only snapshot of one session's metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id
    pub session_id: String,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// When the session was opened
    pub connected_at: DateTime<Utc>,
    /// When the session was closed, if it has been
    pub disconnected_at: Option<DateTime<Utc>>,
    /// Monitored uptime in seconds
    pub total_uptime_secs: f64,
    /// Commands started
    pub total_commands: u64,
    /// File transfers started
    pub total_file_transfers: u64,
    /// Port forwards started
    pub total_port_forwards: u64,
    /// Authentication attempts started
    pub authentication_attempts: u64,
    /// Errors recorded (failed completions plus explicit errors)
    pub total_errors: u64,
    /// Bytes transferred
    pub bytes_transferred: u64,
    /// Failed fraction of completed operations, in [0, 1]
    pub error_rate: f64,
    /// Mean retained latency in seconds
    pub average_latency_secs: f64,
    /// Bytes per second over the session's uptime
    pub throughput_bytes_per_sec: f64,
    /// Highest throughput observed at any refresh
    pub peak_throughput_bytes_per_sec: f64,
    /// Most operations ever concurrently active
    pub peak_concurrent_operations: usize,
    /// Operations active at snapshot time
    pub active_operations: usize,
    /// Per-base-token command counts
    pub command_frequency: BTreeMap<String, u64>,
    /// Recent operations that exceeded the slow threshold
    pub slow_operations: Vec<SlowOperation>,
    /// Recent errors
    pub recent_errors: Vec<ErrorRecord>,
    /// Whether the session was idle at snapshot time
    pub is_idle: bool,
    /// Whether the session was healthy at snapshot time
    pub is_healthy: bool,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}:{} up {}, {} commands, {} errors, {} transferred",
            self.session_id,
            self.host,
            self.port,
            format_duration_secs(self.total_uptime_secs),
            self.total_commands,
            self.total_errors,
            format_bytes(self.bytes_transferred)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> SessionMonitor {
        SessionMonitor::new("s1", "h1", 22)
    }

    #[test]
    fn test_new_session_is_clean() {
        let m = monitor();
        assert!(m.is_active());
        assert!((m.error_rate() - 0.0).abs() < f64::EPSILON);
        assert_eq!(m.total_commands(), 0);
        assert!(m.is_healthy());
        assert!(!m.is_idle());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut m = monitor();
        m.stop();
        let frozen = m.uptime();
        std::thread::sleep(Duration::from_millis(10));
        m.stop();
        assert_eq!(m.uptime(), frozen);
        assert!(!m.is_active());
    }

    #[test]
    fn test_counters_increment_on_start() {
        let mut m = monitor();
        m.track_operation(Uuid::new_v4(), OperationKind::Command, BTreeMap::new());
        m.track_operation(Uuid::new_v4(), OperationKind::FileTransfer, BTreeMap::new());
        m.track_operation(Uuid::new_v4(), OperationKind::Authenticate, BTreeMap::new());
        // None completed yet, but started-counters already reflect them
        assert_eq!(m.total_commands(), 1);
        assert_eq!(m.summary().total_file_transfers, 1);
        assert_eq!(m.summary().authentication_attempts, 1);
        assert_eq!(m.active_operation_count(), 3);
        assert_eq!(m.summary().peak_concurrent_operations, 3);
    }

    #[test]
    fn test_summary_display_is_human_readable() {
        let mut m = monitor();
        m.track_bytes_transferred(2048);
        let text = m.summary().to_string();
        assert!(text.starts_with("s1@h1:22"));
        assert!(text.contains("2.00 KB transferred"));
    }

    #[test]
    fn test_complete_unknown_operation_is_noop() {
        let mut m = monitor();
        let before = m.summary();
        m.complete_operation(Uuid::new_v4(), false);
        let after = m.summary();
        assert_eq!(before.error_rate.to_bits(), after.error_rate.to_bits());
        assert_eq!(before.total_errors, after.total_errors);
    }

    #[test]
    fn test_error_rate_from_completions() {
        let mut m = monitor();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for &id in &ids {
            m.track_operation(id, OperationKind::Command, BTreeMap::new());
        }
        m.complete_operation(ids[0], true);
        m.complete_operation(ids[1], true);
        m.complete_operation(ids[2], false);
        assert_eq!(m.total_commands(), 3);
        assert!((m.error_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.active_operation_count(), 0);
    }

    #[test]
    fn test_slow_operation_recorded() {
        let mut m = monitor();
        let id = Uuid::new_v4();
        m.track_operation(id, OperationKind::FileTransfer, BTreeMap::new());
        m.complete_operation_with_duration(id, true, Duration::from_secs_f64(6.5));
        let summary = m.summary();
        assert_eq!(summary.slow_operations.len(), 1);
        assert!((summary.slow_operations[0].duration_secs - 6.5).abs() < 1e-9);

        // Fast operations are not recorded as slow
        let id2 = Uuid::new_v4();
        m.track_operation(id2, OperationKind::Command, BTreeMap::new());
        m.complete_operation_with_duration(id2, true, Duration::from_millis(100));
        assert_eq!(m.summary().slow_operations.len(), 1);
    }

    #[test]
    fn test_latency_mean() {
        let mut m = monitor();
        for secs in [1.0_f64, 2.0, 3.0] {
            let id = Uuid::new_v4();
            m.track_operation(id, OperationKind::Command, BTreeMap::new());
            m.complete_operation_with_duration(id, true, Duration::from_secs_f64(secs));
        }
        assert!((m.average_latency() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unhealthy_on_high_latency() {
        let mut m = monitor();
        let id = Uuid::new_v4();
        m.track_operation(id, OperationKind::Command, BTreeMap::new());
        m.complete_operation_with_duration(id, true, Duration::from_secs(3));
        assert!(!m.is_healthy());
    }

    #[test]
    fn test_command_frequency_uses_base_token() {
        let mut m = monitor();
        m.track_command("ls -la");
        m.track_command("sudo ls /root");
        m.track_command("cat /etc/hosts | grep local");
        assert_eq!(m.command_frequency().get("ls"), Some(&2));
        assert_eq!(m.command_frequency().get("cat"), Some(&1));
        assert_eq!(m.summary().command_frequency.len(), 2);
        let history = m.command_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].raw, "ls -la");
        assert_eq!(history[2].parsed.base, "cat");
    }

    #[test]
    fn test_track_error_and_bytes() {
        let mut m = monitor();
        m.track_error("connection reset", "command");
        m.track_bytes_transferred(2048);
        assert_eq!(m.total_errors(), 1);
        assert_eq!(m.bytes_transferred(), 2048);
        assert_eq!(m.summary().recent_errors.len(), 1);
    }

    #[test]
    fn test_idle_detection_on_refresh() {
        let mut m = monitor();
        m.refresh(Utc::now());
        assert!(!m.is_idle());
        m.refresh(Utc::now() + chrono::Duration::seconds(301));
        assert!(m.is_idle());
        m.track_command("uptime");
        m.refresh(Utc::now());
        assert!(!m.is_idle());
    }

    #[test]
    fn test_summary_matches_live_state() {
        let mut m = monitor();
        let id = Uuid::new_v4();
        m.track_operation(id, OperationKind::Command, BTreeMap::new());
        m.complete_operation(id, false);
        m.track_bytes_transferred(100);
        let summary = m.summary();
        assert_eq!(summary.session_id, "s1");
        assert_eq!(summary.host, "h1");
        assert_eq!(summary.total_commands, 1);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.bytes_transferred, 100);
        assert!((summary.error_rate - 1.0).abs() < f64::EPSILON);
    }
}
