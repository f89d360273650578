//! Performance spans and bottleneck records

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::BoundedHistory;

/// Log lines retained per span
const SPAN_LOG_CAPACITY: usize = 100;

/// Lifecycle state of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// Span has been started and not yet finished
    InProgress,
    /// Span finished successfully
    Completed,
    /// Span finished with an error
    Failed,
    /// Span was abandoned before finishing
    Cancelled,
}

impl SpanStatus {
    /// Whether this status ends the span's lifecycle
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// A timestamped log line attached to a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLog {
    /// Log message
    pub message: String,
    /// When the line was recorded
    pub logged_at: DateTime<Utc>,
}

/// A timed unit of work, optionally nested under a parent span
#[derive(Debug)]
pub struct PerformanceSpan {
    /// Unique span identifier
    pub id: Uuid,
    /// Human-readable span name
    pub name: String,
    /// Enclosing span, if any
    pub parent_id: Option<Uuid>,
    /// Key-value annotations
    pub tags: BTreeMap<String, String>,
    /// Bounded log history
    pub logs: BoundedHistory<SpanLog>,
    /// Current lifecycle state
    pub status: SpanStatus,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Duration in seconds, set when the span finishes
    pub duration_secs: Option<f64>,
    started: Instant,
}

impl PerformanceSpan {
    /// Starts a new span
    #[must_use]
    pub fn new(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id,
            tags: BTreeMap::new(),
            logs: BoundedHistory::new(SPAN_LOG_CAPACITY),
            status: SpanStatus::InProgress,
            started_at: Utc::now(),
            duration_secs: None,
            started: Instant::now(),
        }
    }

    /// Seconds elapsed since the span started
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Attaches or overwrites a tag
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Appends a timestamped log line
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.append(SpanLog {
            message: message.into(),
            logged_at: Utc::now(),
        });
    }

    /// Finishes the span with a terminal status, measuring its duration.
    ///
    /// Finishing an already-terminal span has no effect.
    pub fn finish(&mut self, status: SpanStatus) {
        self.finish_with_duration(status, self.elapsed_secs());
    }

    /// Finishes the span with an explicit duration in seconds
    pub fn finish_with_duration(&mut self, status: SpanStatus, duration_secs: f64) {
        if self.status.is_terminal() || !status.is_terminal() {
            return;
        }
        self.status = status;
        self.duration_secs = Some(duration_secs);
    }
}

/// Severity of a detected bottleneck, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckSeverity {
    /// Above the span threshold but close to it
    Low,
    /// Over one second
    Medium,
    /// Over two seconds
    High,
    /// Over five seconds
    Critical,
}

impl BottleneckSeverity {
    /// Classifies a duration in seconds
    #[must_use]
    pub fn from_duration(duration_secs: f64) -> Self {
        if duration_secs > 5.0 {
            Self::Critical
        } else if duration_secs > 2.0 {
            Self::High
        } else if duration_secs > 1.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Points deducted from the performance score per bottleneck
    #[must_use]
    pub const fn score_penalty(self) -> u32 {
        match self {
            Self::Critical => 20,
            Self::High => 10,
            Self::Medium => 5,
            Self::Low => 2,
        }
    }
}

impl std::fmt::Display for BottleneckSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// An immutable record of a slow span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    /// Span that triggered detection
    pub span_id: Uuid,
    /// Name of the slow operation
    pub operation: String,
    /// Measured duration in seconds
    pub duration_secs: f64,
    /// Severity classified from the duration
    pub severity: BottleneckSeverity,
    /// Heuristic remediation hints
    pub suggestions: Vec<String>,
    /// When the bottleneck was detected
    pub detected_at: DateTime<Utc>,
}

impl Bottleneck {
    /// Builds a bottleneck record for a slow span, deriving severity and
    /// suggestions from the operation name
    #[must_use]
    pub fn detect(span_id: Uuid, operation: &str, duration_secs: f64) -> Self {
        Self {
            span_id,
            operation: operation.to_string(),
            duration_secs,
            severity: BottleneckSeverity::from_duration(duration_secs),
            suggestions: suggestions_for(operation),
            detected_at: Utc::now(),
        }
    }
}

/// Keyword-based remediation hints; generic profiling advice otherwise
fn suggestions_for(operation: &str) -> Vec<String> {
    let lower = operation.to_lowercase();
    if lower.contains("network") || lower.contains("connect") || lower.contains("request") {
        vec![
            "Check network latency and packet loss to the remote host".to_string(),
            "Consider connection pooling or keepalive to avoid repeated handshakes".to_string(),
        ]
    } else if lower.contains("database") || lower.contains("query") || lower.contains("sql") {
        vec![
            "Review query plans and add indexes for frequent lookups".to_string(),
            "Batch small queries to reduce round trips".to_string(),
        ]
    } else if lower.contains("image") || lower.contains("render") {
        vec![
            "Downscale or cache rendered images".to_string(),
            "Move decoding off the hot path".to_string(),
        ]
    } else if lower.contains("file") || lower.contains("disk") || lower.contains("transfer") {
        vec![
            "Use buffered or streaming I/O for large files".to_string(),
            "Check disk throughput and avoid synchronous writes on the hot path".to_string(),
        ]
    } else {
        vec![
            "Profile this operation to find the dominant cost".to_string(),
            "Consider caching results or moving work off the critical path".to_string(),
        ]
    }
}
