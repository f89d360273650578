//! Cross-session operation lifecycle tracking
//!
//! The [`GlobalOperationMonitor`] mirrors the per-session monitor but is
//! session-agnostic: every operation across all sessions flows through it,
//! producing global totals, success rates, timing averages, and the rolling
//! window of recent completions that anomaly detection reads.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::BoundedHistory;
use crate::metrics::{Counter, TimingWindow};
use crate::operation::{CompletedOperation, ErrorRecord, Operation, OperationKind};
use crate::settings::MonitorSettings;

/// Latency samples retained per operation kind
const TIMING_WINDOW_CAPACITY: usize = 100;

/// Tracks operation lifecycles across all sessions
pub struct GlobalOperationMonitor {
    active: HashMap<Uuid, Operation>,
    total_connections: Counter,
    total_commands: Counter,
    total_file_transfers: Counter,
    total_port_forwards: Counter,
    total_auth_attempts: Counter,
    total_bytes: Counter,
    completed: u64,
    failed: u64,
    command_completed: u64,
    command_failed: u64,
    connect_times: TimingWindow,
    command_times: TimingWindow,
    recent_completed: BoundedHistory<CompletedOperation>,
    recent_errors: BoundedHistory<ErrorRecord>,
}

impl GlobalOperationMonitor {
    /// Creates a monitor with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(&MonitorSettings::default())
    }

    /// Creates a monitor with explicit retention settings
    #[must_use]
    pub fn with_settings(settings: &MonitorSettings) -> Self {
        Self {
            active: HashMap::new(),
            total_connections: Counter::new(),
            total_commands: Counter::new(),
            total_file_transfers: Counter::new(),
            total_port_forwards: Counter::new(),
            total_auth_attempts: Counter::new(),
            total_bytes: Counter::new(),
            completed: 0,
            failed: 0,
            command_completed: 0,
            command_failed: 0,
            connect_times: TimingWindow::new(TIMING_WINDOW_CAPACITY),
            command_times: TimingWindow::new(TIMING_WINDOW_CAPACITY),
            recent_completed: BoundedHistory::new(settings.recent_completed_window),
            recent_errors: BoundedHistory::new(settings.recent_error_history),
        }
    }

    /// Registers the beginning of an operation and increments its
    /// started-counter immediately
    pub fn begin_operation(&mut self, op: Operation) {
        match op.kind {
            OperationKind::Connect => self.total_connections.incr(),
            OperationKind::Command => self.total_commands.incr(),
            OperationKind::FileTransfer => self.total_file_transfers.incr(),
            OperationKind::PortForward => self.total_port_forwards.incr(),
            OperationKind::Authenticate => self.total_auth_attempts.incr(),
            OperationKind::Other => {}
        }
        self.active.insert(op.id, op);
    }

    /// Completes an active operation, measuring its duration since begin.
    ///
    /// Unknown ids are a silent no-op returning `None`.
    pub fn complete_operation(
        &mut self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
        bytes: Option<u64>,
    ) -> Option<CompletedOperation> {
        let elapsed = self.active.get(&id).map(Operation::elapsed)?;
        self.complete_operation_with_duration(id, success, elapsed, error, bytes)
    }

    /// Completes an active operation with an explicit measured duration
    pub fn complete_operation_with_duration(
        &mut self,
        id: Uuid,
        success: bool,
        duration: Duration,
        error: Option<&str>,
        bytes: Option<u64>,
    ) -> Option<CompletedOperation> {
        let Some(op) = self.active.remove(&id) else {
            tracing::debug!(operation = %id, "Ignoring completion for unknown global operation");
            return None;
        };

        let kind = op.kind;
        let mut done = op.complete_with_duration(success, duration);
        if let Some(err) = error {
            done = done.with_error(err);
            self.recent_errors
                .append(ErrorRecord::new(err, kind.display_name()));
        }
        if let Some(n) = bytes {
            done = done.with_bytes(n);
            self.total_bytes.add(n);
        }

        self.completed += 1;
        if !success {
            self.failed += 1;
        }
        match kind {
            OperationKind::Connect => self.connect_times.record(done.duration_secs),
            OperationKind::Command => {
                self.command_times.record(done.duration_secs);
                self.command_completed += 1;
                if !success {
                    self.command_failed += 1;
                }
            }
            _ => {}
        }

        self.recent_completed.append(done.clone());
        Some(done)
    }

    /// Currently active operations, in no particular order
    #[must_use]
    pub fn active_operations(&self) -> Vec<&Operation> {
        self.active.values().collect()
    }

    /// Number of currently active operations
    #[must_use]
    pub fn active_operation_count(&self) -> usize {
        self.active.len()
    }

    /// The `n` most recent completed operations, oldest-first
    #[must_use]
    pub fn recent_completed(&self, n: usize) -> Vec<CompletedOperation> {
        let all = self.recent_completed.snapshot();
        let skip = all.len().saturating_sub(n);
        all.into_iter().skip(skip).collect()
    }

    /// The most recent recorded errors, oldest-first
    #[must_use]
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.snapshot()
    }

    /// Fraction of completed operations that failed, in [0, 1]
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        self.failed as f64 / self.completed as f64
    }

    /// Fraction of completed operations that succeeded, in [0, 1]
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        1.0 - self.error_rate()
    }

    /// Fraction of completed command operations that failed, in [0, 1]
    #[must_use]
    pub fn command_error_rate(&self) -> f64 {
        if self.command_completed == 0 {
            return 0.0;
        }
        self.command_failed as f64 / self.command_completed as f64
    }

    /// Mean connect duration over the retained window, in seconds
    #[must_use]
    pub fn average_connect_time(&self) -> f64 {
        self.connect_times.mean()
    }

    /// Mean command duration over the retained window, in seconds
    #[must_use]
    pub fn average_command_time(&self) -> f64 {
        self.command_times.mean()
    }

    /// Total operations completed (success or failure)
    #[must_use]
    pub const fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Builds a serializable snapshot of global statistics
    #[must_use]
    pub fn stats(&self) -> GlobalStats {
        GlobalStats {
            total_connections: self.total_connections.get(),
            total_commands: self.total_commands.get(),
            total_file_transfers: self.total_file_transfers.get(),
            total_port_forwards: self.total_port_forwards.get(),
            total_auth_attempts: self.total_auth_attempts.get(),
            total_bytes_transferred: self.total_bytes.get(),
            completed_operations: self.completed,
            failed_operations: self.failed,
            success_rate: self.success_rate(),
            error_rate: self.error_rate(),
            command_error_rate: self.command_error_rate(),
            average_connect_time_secs: self.average_connect_time(),
            average_command_time_secs: self.average_command_time(),
            active_operations: self.active.len(),
        }
    }
}

impl Default for GlobalOperationMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobalOperationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalOperationMonitor")
            .field("active", &self.active.len())
            .field("completed", &self.completed)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Read-only snapshot of global operation statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Connections started
    pub total_connections: u64,
    /// Commands started
    pub total_commands: u64,
    /// File transfers started
    pub total_file_transfers: u64,
    /// Port forwards started
    pub total_port_forwards: u64,
    /// Authentication attempts started
    pub total_auth_attempts: u64,
    /// Bytes reported across all completed operations
    pub total_bytes_transferred: u64,
    /// Operations completed (success or failure)
    pub completed_operations: u64,
    /// Operations that completed with failure
    pub failed_operations: u64,
    /// Succeeded fraction of completions, in [0, 1]
    pub success_rate: f64,
    /// Failed fraction of completions, in [0, 1]
    pub error_rate: f64,
    /// Failed fraction of command completions, in [0, 1]
    pub command_error_rate: f64,
    /// Mean connect duration, seconds
    pub average_connect_time_secs: f64,
    /// Mean command duration, seconds
    pub average_command_time_secs: f64,
    /// Operations active at snapshot time
    pub active_operations: usize,
}
