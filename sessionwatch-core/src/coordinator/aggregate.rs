//! Aggregated metrics and realtime status snapshots

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::Alert;
use crate::global::GlobalStats;
use crate::operation::{ErrorRecord, OperationKind};

/// Commands listed in the aggregated top-command ranking
pub(crate) const TOP_COMMAND_COUNT: usize = 10;

/// Cross-session metrics snapshot, published once per aggregation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    /// Live session monitors at snapshot time
    pub total_sessions: usize,
    /// Live sessions currently connected
    pub active_sessions: usize,
    /// Live sessions flagged idle
    pub idle_sessions: usize,
    /// Commands tracked across all live sessions
    pub total_commands: u64,
    /// Errors recorded across all live sessions
    pub total_errors: u64,
    /// Bytes transferred across all live sessions
    pub total_bytes_transferred: u64,
    /// Operations active across all live sessions
    pub active_operations: usize,
    /// Most frequent command base tokens, descending, at most ten
    pub top_commands: Vec<(String, u64)>,
    /// Most recent global error records, oldest-first
    pub recent_errors: Vec<ErrorRecord>,
    /// Global operation statistics
    pub global: GlobalStats,
    /// When the snapshot was computed
    pub aggregated_at: DateTime<Utc>,
}

/// One in-flight operation as seen at status-rebuild time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOperationStatus {
    /// Operation id
    pub id: Uuid,
    /// What kind of work it is
    pub kind: OperationKind,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Owning session, when the operation was routed to one
    pub session_id: Option<String>,
    /// Seconds elapsed since the operation started
    pub elapsed_secs: f64,
}

/// Connection state of one live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether the session is still being monitored
    pub connected: bool,
    /// Whether the session was idle at the last refresh
    pub idle: bool,
}

/// Status rebuilt after every operation start and completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeStatus {
    /// In-flight operations with elapsed durations
    pub active_operations: Vec<ActiveOperationStatus>,
    /// Connection state per live session, keyed by session id
    pub sessions: BTreeMap<String, SessionStatus>,
    /// Operations completed since the coordinator was created
    pub operations_completed: u64,
    /// Operations that completed with failure
    pub operations_failed: u64,
    /// Completions per minute since the coordinator was created, when at
    /// least one minute has elapsed
    pub throughput_per_minute: Option<f64>,
    /// Alerts raised by recent health-check cycles, oldest-first
    pub active_alerts: Vec<Alert>,
    /// When the status was last rebuilt
    pub updated_at: DateTime<Utc>,
}

impl Default for RealtimeStatus {
    fn default() -> Self {
        Self {
            active_operations: Vec::new(),
            sessions: BTreeMap::new(),
            operations_completed: 0,
            operations_failed: 0,
            throughput_per_minute: None,
            active_alerts: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Merges per-session command frequency maps and returns the `n` most
/// frequent bases, descending by count with ties broken alphabetically
pub(crate) fn top_commands<'a>(
    frequency_maps: impl Iterator<Item = &'a BTreeMap<String, u64>>,
    n: usize,
) -> Vec<(String, u64)> {
    let mut merged: BTreeMap<String, u64> = BTreeMap::new();
    for map in frequency_maps {
        for (base, count) in map {
            *merged.entry(base.clone()).or_insert(0) += count;
        }
    }
    let mut ranked: Vec<(String, u64)> = merged.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}
