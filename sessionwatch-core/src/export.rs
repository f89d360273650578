//! Versioned JSON export of the full monitoring snapshot
//!
//! The export document carries everything needed to inspect the engine's
//! state offline: aggregated metrics, health, realtime status, live and
//! archived session summaries, and the performance report. Maps use
//! `BTreeMap` so exported documents have stable key order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::{AggregatedMetrics, HealthStatus, RealtimeStatus};
use crate::perf::PerformanceReport;
use crate::session::SessionSummary;

/// Version written into every export document
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Errors from encoding or decoding export documents
#[derive(Debug, Error)]
pub enum ExportError {
    /// JSON encoding or decoding failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The document was written by an incompatible version
    #[error("unsupported export format version {0}, expected {EXPORT_FORMAT_VERSION}")]
    UnsupportedVersion(u32),
}

/// Result alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Complete monitoring snapshot for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    /// Document format version
    pub format_version: u32,
    /// When the export was taken
    pub exported_at: DateTime<Utc>,
    /// Latest aggregated metrics, when a cycle has run
    pub aggregated: Option<AggregatedMetrics>,
    /// Latest health status, when a cycle has run
    pub health: Option<HealthStatus>,
    /// Realtime status at export time
    pub realtime: RealtimeStatus,
    /// Live session summaries, keyed by session id
    pub sessions: BTreeMap<String, SessionSummary>,
    /// Terminal summaries of removed sessions, oldest-first
    pub archived_sessions: Vec<SessionSummary>,
    /// Performance score, bottlenecks, and measurements
    pub performance: PerformanceReport,
}

impl MetricsExport {
    /// Assembles an export document timestamped now
    #[must_use]
    pub fn new(
        aggregated: Option<AggregatedMetrics>,
        health: Option<HealthStatus>,
        realtime: RealtimeStatus,
        sessions: BTreeMap<String, SessionSummary>,
        archived_sessions: Vec<SessionSummary>,
        performance: PerformanceReport,
    ) -> Self {
        Self {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: Utc::now(),
            aggregated,
            health,
            realtime,
            sessions,
            archived_sessions,
            performance,
        }
    }

    /// Encodes the document as pretty-printed JSON
    pub fn to_json_string(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a document, rejecting unknown format versions
    pub fn from_json_str(json: &str) -> ExportResult<Self> {
        let export: Self = serde_json::from_str(json)?;
        if export.format_version != EXPORT_FORMAT_VERSION {
            return Err(ExportError::UnsupportedVersion(export.format_version));
        }
        Ok(export)
    }
}
