//! Property-based tests for the weighted health score

use proptest::prelude::*;

use sessionwatch_core::overall_health_score;

proptest! {
    /// The health score is always clamped to [0, 1]
    #[test]
    fn prop_health_in_unit_interval(
        global_error_rate in 0.0f64..=1.0,
        command_error_rate in 0.0f64..=1.0,
        connect_secs in 0.0f64..30.0,
        command_secs in 0.0f64..30.0,
    ) {
        let score = overall_health_score(
            global_error_rate,
            command_error_rate,
            connect_secs,
            command_secs,
        );
        prop_assert!((0.0..=1.0).contains(&score));
    }

    /// More errors never improve health, all else equal
    #[test]
    fn prop_health_monotone_in_error_rate(
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        command_error_rate in 0.0f64..=1.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let healthier = overall_health_score(lo, command_error_rate, 0.0, 0.0);
        let sicker = overall_health_score(hi, command_error_rate, 0.0, 0.0);
        prop_assert!(sicker <= healthier + 1e-12);
    }

    /// Fast sessions with no errors are perfectly healthy
    #[test]
    fn prop_no_errors_fast_is_perfect(connect_secs in 0.0f64..=5.0, command_secs in 0.0f64..=2.0) {
        let score = overall_health_score(0.0, 0.0, connect_secs, command_secs);
        prop_assert!((score - 1.0).abs() < f64::EPSILON);
    }
}

#[test]
fn test_reference_health_example() {
    // 1 - 0.3 * 0.05 = 0.985
    let score = overall_health_score(0.05, 0.0, 1.0, 0.5);
    assert!((score - 0.985).abs() < 1e-9);
}

#[test]
fn test_both_latency_penalties_apply() {
    let score = overall_health_score(0.0, 0.0, 5.1, 2.1);
    assert!((score - 0.8).abs() < 1e-9);
}
