//! Heuristic anomaly detection over recent completed operations

use serde::{Deserialize, Serialize};

use crate::events::AlertSeverity;
use crate::operation::CompletedOperation;

/// Category of a detected anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Too many failures in the recent completion window
    HighFailureRate,
    /// An error message mentioned a timeout
    Timeout,
    /// An error message mentioned authentication
    AuthenticationFailure,
    /// An error message mentioned a refused connection
    ConnectionRefused,
}

impl AnomalyKind {
    /// Alert severity this anomaly maps to
    #[must_use]
    pub const fn severity(self) -> AlertSeverity {
        match self {
            Self::HighFailureRate => AlertSeverity::Critical,
            Self::Timeout | Self::AuthenticationFailure | Self::ConnectionRefused => {
                AlertSeverity::Warning
            }
        }
    }
}

/// A detected anomaly with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// What category of anomaly was detected
    pub kind: AnomalyKind,
    /// Description suitable for an alert
    pub message: String,
}

/// Strategy for spotting anomalies in recent completions.
///
/// Detection is best-effort heuristics; detectors must not fail.
pub trait AnomalyDetector: Send + Sync {
    /// Inspects recent completed operations, oldest-first
    fn detect(&self, recent: &[CompletedOperation]) -> Vec<Anomaly>;
}

/// Default detector: failure counting plus substring matching on error text
#[derive(Debug, Clone)]
pub struct SubstringAnomalyDetector {
    /// How many trailing completions to inspect
    pub window: usize,
    /// Failures within the window above which a high-failure-rate anomaly fires
    pub failure_threshold: usize,
}

impl Default for SubstringAnomalyDetector {
    fn default() -> Self {
        Self {
            window: 10,
            failure_threshold: 5,
        }
    }
}

impl AnomalyDetector for SubstringAnomalyDetector {
    fn detect(&self, recent: &[CompletedOperation]) -> Vec<Anomaly> {
        let mut found = Vec::new();
        let start = recent.len().saturating_sub(self.window);
        let window = &recent[start..];

        let failures = window.iter().filter(|op| !op.success).count();
        if failures > self.failure_threshold {
            found.push(Anomaly {
                kind: AnomalyKind::HighFailureRate,
                message: format!(
                    "{failures} of the last {} operations failed",
                    window.len()
                ),
            });
        }

        for op in window {
            let Some(error) = op.error.as_deref() else {
                continue;
            };
            let lower = error.to_lowercase();
            if lower.contains("timeout") {
                found.push(Anomaly {
                    kind: AnomalyKind::Timeout,
                    message: format!("Operation timed out: {error}"),
                });
            }
            if lower.contains("authentication") {
                found.push(Anomaly {
                    kind: AnomalyKind::AuthenticationFailure,
                    message: format!("Authentication failure: {error}"),
                });
            }
            if lower.contains("connection refused") {
                found.push(Anomaly {
                    kind: AnomalyKind::ConnectionRefused,
                    message: format!("Connection refused: {error}"),
                });
            }
        }

        found
    }
}
