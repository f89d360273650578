//! Health scoring and recommendations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error rate above which the high-error-rate flag is set
const HIGH_ERROR_RATE_LIMIT: f64 = 0.1;

/// Average command latency (seconds) above which the high-latency flag is set
const HIGH_LATENCY_LIMIT_SECS: f64 = 2.0;

/// Completions per minute below which the low-throughput flag is set
const LOW_THROUGHPUT_LIMIT: f64 = 1.0;

/// Connect time (seconds) above which the health score is penalized
const SLOW_CONNECT_LIMIT_SECS: f64 = 5.0;

/// Health snapshot published once per health-check cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Weighted score in [0, 1]; 1.0 is fully healthy
    pub overall_health: f64,
    /// Global error rate exceeds 10 %
    pub has_high_error_rate: bool,
    /// Average command latency exceeds 2 seconds
    pub has_high_latency: bool,
    /// Fewer than one completed operation per minute
    pub has_low_throughput: bool,
    /// Per-session health, keyed by session id
    pub session_health: BTreeMap<String, bool>,
    /// Remediation hints, present when any flag is set
    pub recommendations: Vec<String>,
    /// When the snapshot was taken
    pub checked_at: DateTime<Utc>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            overall_health: 1.0,
            has_high_error_rate: false,
            has_high_latency: false,
            has_low_throughput: false,
            session_health: BTreeMap::new(),
            recommendations: Vec::new(),
            checked_at: Utc::now(),
        }
    }
}

/// Computes the weighted overall health score in [0, 1].
///
/// Starts at 1.0; deducts 0.3 × global error rate, 0.2 × command error
/// rate, 0.1 when connects average over 5 s, and 0.1 when commands average
/// over 2 s.
#[must_use]
pub fn overall_health_score(
    global_error_rate: f64,
    command_error_rate: f64,
    average_connect_secs: f64,
    average_command_secs: f64,
) -> f64 {
    let mut score = 1.0;
    score -= 0.3 * global_error_rate;
    score -= 0.2 * command_error_rate;
    if average_connect_secs > SLOW_CONNECT_LIMIT_SECS {
        score -= 0.1;
    }
    if average_command_secs > HIGH_LATENCY_LIMIT_SECS {
        score -= 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// Evaluates the three health flags
#[must_use]
pub fn health_flags(
    error_rate: f64,
    average_command_secs: f64,
    throughput_per_minute: Option<f64>,
) -> (bool, bool, bool) {
    let high_error_rate = error_rate > HIGH_ERROR_RATE_LIMIT;
    let high_latency = average_command_secs > HIGH_LATENCY_LIMIT_SECS;
    let low_throughput = throughput_per_minute.is_some_and(|t| t < LOW_THROUGHPUT_LIMIT);
    (high_error_rate, high_latency, low_throughput)
}

/// Builds remediation hints for whichever flags are set
#[must_use]
pub fn recommendations_for(
    has_high_error_rate: bool,
    has_high_latency: bool,
    has_low_throughput: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    if has_high_error_rate {
        out.push(
            "Error rate exceeds 10%; inspect recent errors and verify host reachability"
                .to_string(),
        );
    }
    if has_high_latency {
        out.push(
            "Average command latency exceeds 2s; check network conditions and remote load"
                .to_string(),
        );
    }
    if has_low_throughput {
        out.push(
            "Operation throughput is below 1/min; sessions may be stalled or idle".to_string(),
        );
    }
    out
}
