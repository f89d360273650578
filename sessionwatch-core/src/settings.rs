//! Engine settings: cycle intervals, retention capacities, and thresholds
//!
//! All values have serde defaults so a partially specified settings document
//! deserializes into a working configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable settings for the monitoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Aggregation cycle interval in seconds (1–300, default: 5)
    #[serde(default = "default_aggregation_interval_secs")]
    pub aggregation_interval_secs: u16,
    /// Health-check cycle interval in seconds (1–300, default: 10)
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u16,
    /// Latency samples retained per session (default: 100)
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
    /// Command history entries retained per session (default: 100)
    #[serde(default = "default_command_history")]
    pub command_history: usize,
    /// Slow-operation records retained per session (default: 10)
    #[serde(default = "default_slow_operation_history")]
    pub slow_operation_history: usize,
    /// Recent error records retained per monitor (default: 10)
    #[serde(default = "default_recent_error_history")]
    pub recent_error_history: usize,
    /// Bottleneck records retained by the performance tracker (default: 10)
    #[serde(default = "default_bottleneck_history")]
    pub bottleneck_history: usize,
    /// Completed operations retained in the global rolling window (default: 50)
    #[serde(default = "default_recent_completed_window")]
    pub recent_completed_window: usize,
    /// Archived session summaries retained by the coordinator (default: 50)
    #[serde(default = "default_archived_sessions")]
    pub archived_sessions: usize,
    /// Duration above which a completed operation is recorded as slow (default: 5.0s)
    #[serde(default = "default_slow_operation_threshold_secs")]
    pub slow_operation_threshold_secs: f64,
    /// Duration above which a span is flagged as a bottleneck (default: 1.0s)
    #[serde(default = "default_slow_span_threshold_secs")]
    pub slow_span_threshold_secs: f64,
    /// Inactivity period after which a session is considered idle (default: 300s)
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u32,
}

const fn default_aggregation_interval_secs() -> u16 {
    5
}

const fn default_health_check_interval_secs() -> u16 {
    10
}

const fn default_latency_window() -> usize {
    100
}

const fn default_command_history() -> usize {
    100
}

const fn default_slow_operation_history() -> usize {
    10
}

const fn default_recent_error_history() -> usize {
    10
}

const fn default_bottleneck_history() -> usize {
    10
}

const fn default_recent_completed_window() -> usize {
    50
}

const fn default_archived_sessions() -> usize {
    50
}

const fn default_slow_operation_threshold_secs() -> f64 {
    5.0
}

const fn default_slow_span_threshold_secs() -> f64 {
    1.0
}

const fn default_idle_threshold_secs() -> u32 {
    300
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            aggregation_interval_secs: default_aggregation_interval_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
            latency_window: default_latency_window(),
            command_history: default_command_history(),
            slow_operation_history: default_slow_operation_history(),
            recent_error_history: default_recent_error_history(),
            bottleneck_history: default_bottleneck_history(),
            recent_completed_window: default_recent_completed_window(),
            archived_sessions: default_archived_sessions(),
            slow_operation_threshold_secs: default_slow_operation_threshold_secs(),
            slow_span_threshold_secs: default_slow_span_threshold_secs(),
            idle_threshold_secs: default_idle_threshold_secs(),
        }
    }
}

impl MonitorSettings {
    /// Returns the aggregation interval clamped to 1–300 seconds
    #[must_use]
    pub fn effective_aggregation_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.aggregation_interval_secs.clamp(1, 300)))
    }

    /// Returns the health-check interval clamped to 1–300 seconds
    #[must_use]
    pub fn effective_health_check_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.health_check_interval_secs.clamp(1, 300)))
    }
}
