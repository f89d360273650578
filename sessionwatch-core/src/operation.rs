//! Data model for tracked operations
//!
//! An [`Operation`] is one unit of tracked work (connect, command, file
//! transfer, port forward, authentication). It is created when work begins
//! and turned into an immutable [`CompletedOperation`] exactly once when the
//! transport layer reports completion.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of work an operation represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Opening a remote connection
    Connect,
    /// Executing a remote command
    Command,
    /// Transferring a file
    FileTransfer,
    /// Establishing a port forward
    PortForward,
    /// An authentication attempt
    Authenticate,
    /// Anything else the transport layer reports
    Other,
}

impl OperationKind {
    /// Returns a stable display name for logs and error records
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Command => "command",
            Self::FileTransfer => "file_transfer",
            Self::PortForward => "port_forward",
            Self::Authenticate => "authenticate",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// An in-flight tracked operation.
///
/// Holds both a wall-clock start time (for reporting) and a monotonic start
/// instant (for duration measurement). Mutated only once, by completion.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Unique id, caller-supplied or generated
    pub id: Uuid,
    /// What kind of work this is
    pub kind: OperationKind,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Free-form annotations supplied by the producer
    pub metadata: BTreeMap<String, String>,
    started: Instant,
}

impl Operation {
    /// Creates a new operation with a generated id
    #[must_use]
    pub fn new(kind: OperationKind, host: impl Into<String>, port: u16) -> Self {
        Self::with_id(Uuid::new_v4(), kind, host, port)
    }

    /// Creates a new operation with a caller-supplied id
    #[must_use]
    pub fn with_id(id: Uuid, kind: OperationKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            kind,
            host: host.into(),
            port,
            started_at: Utc::now(),
            metadata: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    /// Attaches metadata, replacing any existing value for the key
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Elapsed time since the operation started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Completes the operation, measuring the duration from the start instant
    #[must_use]
    pub fn complete(self, success: bool) -> CompletedOperation {
        let duration = self.started.elapsed();
        self.complete_with_duration(success, duration)
    }

    /// Completes the operation with an explicit duration.
    ///
    /// Used by the monitors when the producer reports a measured duration,
    /// and by tests that need deterministic timings.
    #[must_use]
    pub fn complete_with_duration(self, success: bool, duration: Duration) -> CompletedOperation {
        CompletedOperation {
            id: self.id,
            kind: self.kind,
            host: self.host,
            port: self.port,
            started_at: self.started_at,
            ended_at: Utc::now(),
            duration_secs: duration.as_secs_f64(),
            success,
            error: None,
            bytes_transferred: None,
            metadata: self.metadata,
        }
    }
}

/// A finished operation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOperation {
    /// Operation id
    pub id: Uuid,
    /// What kind of work this was
    pub kind: OperationKind,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Wall-clock end time
    pub ended_at: DateTime<Utc>,
    /// Measured duration in seconds
    pub duration_secs: f64,
    /// Whether the work succeeded
    pub success: bool,
    /// Error text reported by the producer, if any
    pub error: Option<String>,
    /// Bytes moved by the operation, if reported
    pub bytes_transferred: Option<u64>,
    /// Annotations carried over from the in-flight operation
    pub metadata: BTreeMap<String, String>,
}

impl CompletedOperation {
    /// Attaches the producer-reported error text
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches the producer-reported byte count
    #[must_use]
    pub const fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes_transferred = Some(bytes);
        self
    }
}

/// A recorded error with its originating operation, kept in bounded histories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error message text
    pub message: String,
    /// Name of the operation that produced it
    pub operation: String,
    /// When it was recorded
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Creates a new error record timestamped now
    #[must_use]
    pub fn new(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            operation: operation.into(),
            occurred_at: Utc::now(),
        }
    }
}
