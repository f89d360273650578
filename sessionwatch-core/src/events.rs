//! Observer fan-out for monitoring snapshots
//!
//! The coordinator publishes immutable snapshots over a
//! [`tokio::sync::broadcast`] channel once per cycle. Lagging receivers
//! lose the oldest events, which is acceptable for snapshot streams where
//! only the latest value matters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::{AggregatedMetrics, HealthStatus};
use crate::session::SessionSummary;

/// Broadcast channel capacity for monitor events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Urgency of a raised alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational, no action needed
    Info,
    /// Degraded behavior worth investigating
    Warning,
    /// Requires attention
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// A single alert raised by anomaly detection or health checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// How urgent the alert is
    pub severity: AlertSeverity,
    /// Human-readable description
    pub message: String,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Creates an alert timestamped now
    #[must_use]
    pub fn new(severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}

/// Events published by the coordinator
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A new aggregated-metrics snapshot is available
    MetricsUpdated(AggregatedMetrics),
    /// A new health snapshot is available
    HealthUpdated(HealthStatus),
    /// Anomaly detection or a health check raised an alert
    AlertRaised(Alert),
    /// A session monitor was removed and its terminal summary archived
    SessionArchived(SessionSummary),
}
