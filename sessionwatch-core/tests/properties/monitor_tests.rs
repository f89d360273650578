//! Property-based tests for session and global monitors

use std::collections::BTreeMap;
use std::time::Duration;

use proptest::prelude::*;
use uuid::Uuid;

use sessionwatch_core::{
    GlobalOperationMonitor, Operation, OperationKind, SessionMonitor,
};

fn arb_outcomes() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..64)
}

proptest! {
    /// Session error rate is always a valid ratio in [0, 1]
    #[test]
    fn prop_session_error_rate_in_unit_interval(outcomes in arb_outcomes()) {
        let mut monitor = SessionMonitor::new("s1", "h1", 22);
        for success in &outcomes {
            let id = Uuid::new_v4();
            monitor.track_operation(id, OperationKind::Command, BTreeMap::new());
            monitor.complete_operation_with_duration(id, *success, Duration::from_millis(10));
        }
        let rate = monitor.error_rate();
        prop_assert!((0.0..=1.0).contains(&rate));
        let failures = outcomes.iter().filter(|s| !**s).count();
        if outcomes.is_empty() {
            prop_assert_eq!(rate, 0.0);
        } else {
            let expected = failures as f64 / outcomes.len() as f64;
            prop_assert!((rate - expected).abs() < 1e-9);
        }
    }

    /// Started-counters reflect starts, not completions
    #[test]
    fn prop_command_counter_counts_starts(started in 0usize..40, completed_of in 0usize..40) {
        let mut monitor = SessionMonitor::new("s1", "h1", 22);
        let mut ids = Vec::new();
        for _ in 0..started {
            let id = Uuid::new_v4();
            monitor.track_operation(id, OperationKind::Command, BTreeMap::new());
            ids.push(id);
        }
        for id in ids.iter().take(completed_of.min(started)) {
            monitor.complete_operation_with_duration(*id, true, Duration::from_millis(5));
        }
        prop_assert_eq!(monitor.total_commands(), started as u64);
    }

    /// Unknown completions never change observable state
    #[test]
    fn prop_unknown_completion_is_inert(count in 1usize..20) {
        let mut monitor = SessionMonitor::new("s1", "h1", 22);
        for _ in 0..count {
            monitor.complete_operation_with_duration(Uuid::new_v4(), false, Duration::from_secs(9));
        }
        prop_assert_eq!(monitor.error_rate(), 0.0);
        prop_assert_eq!(monitor.average_latency(), 0.0);
        prop_assert_eq!(monitor.active_operation_count(), 0);
    }

    /// Global error and success rates always sum to 1 once anything completed
    #[test]
    fn prop_global_rates_complementary(outcomes in arb_outcomes()) {
        let mut monitor = GlobalOperationMonitor::new();
        for success in &outcomes {
            let op = Operation::new(OperationKind::Command, "h1", 22);
            let id = op.id;
            monitor.begin_operation(op);
            monitor.complete_operation_with_duration(id, *success, Duration::from_millis(1), None, None);
        }
        let error_rate = monitor.error_rate();
        prop_assert!((0.0..=1.0).contains(&error_rate));
        prop_assert!((error_rate + monitor.success_rate() - 1.0).abs() < 1e-9);
    }

    /// Average latency equals the arithmetic mean of recorded durations
    #[test]
    fn prop_session_latency_is_mean(durations_ms in prop::collection::vec(1u64..5000, 1..50)) {
        let mut monitor = SessionMonitor::new("s1", "h1", 22);
        for ms in &durations_ms {
            let id = Uuid::new_v4();
            monitor.track_operation(id, OperationKind::Command, BTreeMap::new());
            monitor.complete_operation_with_duration(id, true, Duration::from_millis(*ms));
        }
        let expected = durations_ms.iter().map(|ms| *ms as f64 / 1000.0).sum::<f64>()
            / durations_ms.len() as f64;
        prop_assert!((monitor.average_latency() - expected).abs() < 1e-9);
    }
}
