//! Per-session telemetry
//!
//! A [`SessionMonitor`] owns all metrics for one logical connection:
//! operation and command tracking, error rate, latency, throughput, and
//! idle detection. Monitors are created and owned exclusively by the
//! coordinator; on removal a terminal [`SessionSummary`] is archived.

mod monitor;

pub use monitor::{CommandRecord, SessionMonitor, SessionSummary, SlowOperation};
