//! Export round-trip over a populated coordinator

use std::collections::BTreeMap;
use std::time::Duration;

use sessionwatch_core::{
    MetricsExport, MonitoringCoordinator, OperationKind, SpanStatus, EXPORT_FORMAT_VERSION,
};

fn populated_coordinator() -> MonitoringCoordinator {
    let c = MonitoringCoordinator::new();
    c.create_session_monitor("alpha", "h1", 22);
    c.create_session_monitor("beta", "h2", 2222);

    for (session, ok) in [("alpha", true), ("alpha", false), ("beta", true)] {
        c.command_issued("tail -f /var/log/auth.log", Some(session));
        let id = c.start_operation(
            OperationKind::Command,
            "h",
            22,
            Some(session),
            BTreeMap::new(),
        );
        let error = (!ok).then_some("timeout reading output");
        c.complete_operation_with_duration(id, ok, Duration::from_millis(150), error, None);
    }

    let span = c.start_span("initial sync", None);
    c.complete_span_with_duration(span, SpanStatus::Completed, 1.4);

    c.create_session_monitor("gone", "h3", 22);
    c.remove_session_monitor("gone");

    c.run_aggregation_cycle();
    c.run_health_check_cycle();
    c
}

#[test]
fn test_export_round_trip_preserves_document() {
    let c = populated_coordinator();
    let export = c.export_snapshot();
    let json = export.to_json_string().unwrap();
    let back = MetricsExport::from_json_str(&json).unwrap();
    assert_eq!(export, back);
}

#[test]
fn test_export_reflects_coordinator_state() {
    let c = populated_coordinator();
    let export = c.export_snapshot();

    assert_eq!(export.format_version, EXPORT_FORMAT_VERSION);
    assert_eq!(export.sessions.len(), 2);
    assert!(export.sessions.contains_key("alpha"));
    assert!(export.sessions.contains_key("beta"));
    assert_eq!(export.archived_sessions.len(), 1);
    assert_eq!(export.archived_sessions[0].session_id, "gone");

    let aggregated = export.aggregated.as_ref().unwrap();
    assert_eq!(aggregated.total_commands, 3);
    assert_eq!(aggregated.top_commands[0].0, "tail");

    let health = export.health.as_ref().unwrap();
    assert!(health.overall_health > 0.0 && health.overall_health <= 1.0);

    assert_eq!(export.performance.bottlenecks.len(), 1);
    assert_eq!(export.performance.score, 95);
    assert_eq!(export.realtime.operations_completed, 3);
}

#[test]
fn test_exported_json_has_sorted_session_keys() {
    let c = populated_coordinator();
    let json = c.export_snapshot().to_json_string().unwrap();
    let alpha = json.find("\"alpha\"").unwrap();
    let beta = json.find("\"beta\"").unwrap();
    assert!(alpha < beta);
}
