//! End-to-end monitoring flow through the coordinator

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sessionwatch_core::{
    Anomaly, AnomalyDetector, AnomalyKind, CompletedOperation, MonitorEvent,
    MonitoringCoordinator, MonitorSettings, OperationKind, SpanStatus,
};

fn run_command(
    coordinator: &MonitoringCoordinator,
    session: &str,
    raw: &str,
    success: bool,
    duration: Duration,
) {
    coordinator.command_issued(raw, Some(session));
    let id = coordinator.start_operation(
        OperationKind::Command,
        "h1",
        22,
        Some(session),
        BTreeMap::new(),
    );
    let error = (!success).then_some("command exited nonzero");
    coordinator.complete_operation_with_duration(id, success, duration, error, None);
}

#[test]
fn test_single_session_command_scenario() {
    super::init_tracing();
    // One session, three commands, one of which fails
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("s1", "h1", 22);

    run_command(&c, "s1", "ls -la", true, Duration::from_millis(120));
    run_command(&c, "s1", "cat /etc/hosts", true, Duration::from_millis(80));
    run_command(&c, "s1", "grep root /etc/shadow", false, Duration::from_millis(40));

    let summary = c.session_summary("s1").unwrap();
    assert_eq!(summary.total_commands, 3);
    assert!((summary.error_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.command_frequency.get("ls"), Some(&1));
    assert_eq!(summary.command_frequency.get("cat"), Some(&1));
    assert_eq!(summary.command_frequency.get("grep"), Some(&1));
    // One failure in three pushes the error rate over the healthy limit
    assert!(!summary.is_healthy);
}

#[test]
fn test_aggregated_totals_equal_session_sums() {
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("s1", "h1", 22);
    c.create_session_monitor("s2", "h2", 22);
    c.create_session_monitor("s3", "h3", 2222);

    run_command(&c, "s1", "uptime", true, Duration::from_millis(30));
    run_command(&c, "s1", "uptime", true, Duration::from_millis(25));
    run_command(&c, "s2", "df -h", true, Duration::from_millis(60));
    run_command(&c, "s3", "journalctl -u sshd", false, Duration::from_millis(200));

    c.run_aggregation_cycle();
    let metrics = c.aggregated_metrics().unwrap();

    let summaries = c.session_summaries();
    let expected_commands: u64 = summaries.values().map(|s| s.total_commands).sum();
    let expected_errors: u64 = summaries.values().map(|s| s.total_errors).sum();
    let expected_bytes: u64 = summaries.values().map(|s| s.bytes_transferred).sum();

    assert_eq!(metrics.total_sessions, 3);
    assert_eq!(metrics.total_commands, expected_commands);
    assert_eq!(metrics.total_errors, expected_errors);
    assert_eq!(metrics.total_bytes_transferred, expected_bytes);
    assert_eq!(metrics.top_commands[0], ("uptime".to_string(), 2));
}

#[test]
fn test_removed_session_archive_matches_live_snapshot() {
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("s1", "h1", 22);
    run_command(&c, "s1", "make build", false, Duration::from_millis(900));
    run_command(&c, "s1", "make test", true, Duration::from_millis(700));

    let live = c.session_summary("s1").unwrap();
    let archived = c.remove_session_monitor("s1").unwrap();

    assert_eq!(archived.total_commands, live.total_commands);
    assert_eq!(archived.total_errors, live.total_errors);
    assert_eq!(archived.error_rate, live.error_rate);
    assert_eq!(archived.command_frequency, live.command_frequency);
    assert!(archived.disconnected_at.is_some());
    assert_eq!(c.archived_sessions().last().unwrap(), &archived);
}

#[test]
fn test_file_transfer_bytes_fan_out() {
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("s1", "h1", 22);
    let id = c.start_operation(
        OperationKind::FileTransfer,
        "h1",
        22,
        Some("s1"),
        BTreeMap::from([("path".to_string(), "/tmp/archive.tar".to_string())]),
    );
    c.complete_operation_with_duration(id, true, Duration::from_secs(2), None, Some(1_048_576));

    let summary = c.session_summary("s1").unwrap();
    assert_eq!(summary.total_file_transfers, 1);
    assert_eq!(summary.bytes_transferred, 1_048_576);

    c.run_aggregation_cycle();
    let metrics = c.aggregated_metrics().unwrap();
    assert_eq!(metrics.global.total_bytes_transferred, 1_048_576);
}

#[test]
fn test_slow_operations_surface_in_summary_and_perf() {
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("s1", "h1", 22);
    let id = c.start_operation(
        OperationKind::Command,
        "h1",
        22,
        Some("s1"),
        BTreeMap::new(),
    );
    c.complete_operation_with_duration(id, true, Duration::from_secs(6), None, None);

    let summary = c.session_summary("s1").unwrap();
    assert_eq!(summary.slow_operations.len(), 1);
    assert!(summary.slow_operations[0].duration_secs > 5.0);

    let span = c.start_span("file transfer", None);
    c.complete_span_with_duration(span, SpanStatus::Completed, 6.0);
    let report = c.performance_report();
    assert_eq!(report.bottlenecks.len(), 1);
    assert_eq!(report.score, 80);
}

#[tokio::test]
async fn test_periodic_cycles_publish_events() {
    let settings = MonitorSettings {
        aggregation_interval_secs: 1,
        health_check_interval_secs: 1,
        ..Default::default()
    };
    super::init_tracing();
    let c = MonitoringCoordinator::with_settings(settings);
    c.create_session_monitor("s1", "h1", 22);
    let mut rx = c.subscribe();

    c.start();
    let mut saw_metrics = false;
    let mut saw_health = false;
    // Both intervals tick immediately on startup
    for _ in 0..4 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within interval")
            .expect("channel open");
        match event {
            MonitorEvent::MetricsUpdated(_) => saw_metrics = true,
            MonitorEvent::HealthUpdated(_) => saw_health = true,
            _ => {}
        }
        if saw_metrics && saw_health {
            break;
        }
    }
    c.shutdown().await;
    assert!(saw_metrics);
    assert!(saw_health);
}

#[derive(Debug)]
struct AlwaysAnomalous;

impl AnomalyDetector for AlwaysAnomalous {
    fn detect(&self, _recent: &[CompletedOperation]) -> Vec<Anomaly> {
        vec![Anomaly {
            kind: AnomalyKind::Timeout,
            message: "synthetic timeout".to_string(),
        }]
    }
}

#[tokio::test]
async fn test_custom_anomaly_detector_raises_alerts() {
    let c = MonitoringCoordinator::new().with_anomaly_detector(Arc::new(AlwaysAnomalous));
    let mut rx = c.subscribe();
    c.run_health_check_cycle();

    let mut saw_alert = false;
    while let Ok(event) = rx.try_recv() {
        if let MonitorEvent::AlertRaised(alert) = event {
            assert_eq!(alert.message, "synthetic timeout");
            saw_alert = true;
        }
    }
    assert!(saw_alert);
}

#[test]
fn test_failure_burst_detected_by_default_detector() {
    let c = MonitoringCoordinator::new();
    for _ in 0..8 {
        let id = c.start_operation(OperationKind::Command, "h1", 22, None, BTreeMap::new());
        c.complete_operation_with_duration(
            id,
            false,
            Duration::from_millis(10),
            Some("connection refused by peer"),
            None,
        );
    }
    let mut rx = c.subscribe();
    c.run_health_check_cycle();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MonitorEvent::AlertRaised(alert) = event {
            kinds.push(alert.severity);
        }
    }
    assert!(!kinds.is_empty());
    let health = c.health_status().unwrap();
    assert!(health.has_high_error_rate);
    assert!((health.overall_health - 0.5).abs() < 1e-9);
}
