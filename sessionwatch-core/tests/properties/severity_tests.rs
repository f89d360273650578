//! Property-based tests for bottleneck severity and performance scoring

use proptest::prelude::*;
use uuid::Uuid;

use sessionwatch_core::{BottleneckSeverity, PerformanceTracker, SpanStatus};

proptest! {
    /// Severity classification matches the threshold bands exactly
    #[test]
    fn prop_severity_bands(duration in 0.0f64..20.0) {
        let severity = BottleneckSeverity::from_duration(duration);
        let expected = if duration > 5.0 {
            BottleneckSeverity::Critical
        } else if duration > 2.0 {
            BottleneckSeverity::High
        } else if duration > 1.0 {
            BottleneckSeverity::Medium
        } else {
            BottleneckSeverity::Low
        };
        prop_assert_eq!(severity, expected);
    }

    /// Severity is monotone in duration
    #[test]
    fn prop_severity_monotone(a in 0.0f64..20.0, b in 0.0f64..20.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(BottleneckSeverity::from_duration(lo) <= BottleneckSeverity::from_duration(hi));
    }

    /// The performance score stays within [0, 100] for any mix of spans
    #[test]
    fn prop_score_in_range(durations in prop::collection::vec(0.1f64..15.0, 0..20)) {
        let mut tracker = PerformanceTracker::new();
        for duration in &durations {
            let id = tracker.start_span("op", None);
            tracker.complete_span_with_duration(id, SpanStatus::Completed, *duration);
        }
        prop_assert!(tracker.performance_score() <= 100);
    }

    /// Completing unknown spans never affects the score
    #[test]
    fn prop_unknown_span_completions_inert(count in 1usize..10) {
        let mut tracker = PerformanceTracker::new();
        for _ in 0..count {
            tracker.complete_span(Uuid::new_v4(), SpanStatus::Failed);
        }
        prop_assert_eq!(tracker.performance_score(), 100);
        prop_assert!(tracker.bottlenecks().is_empty());
    }
}

#[test]
fn test_reference_severity_examples() {
    assert_eq!(BottleneckSeverity::from_duration(0.5), BottleneckSeverity::Low);
    assert_eq!(BottleneckSeverity::from_duration(1.5), BottleneckSeverity::Medium);
    assert_eq!(BottleneckSeverity::from_duration(3.0), BottleneckSeverity::High);
    assert_eq!(BottleneckSeverity::from_duration(6.0), BottleneckSeverity::Critical);
}

#[test]
fn test_reference_score_example() {
    // One critical and one high bottleneck: 100 - 20 - 10
    let mut tracker = PerformanceTracker::new();
    let a = tracker.start_span("slow query", None);
    tracker.complete_span_with_duration(a, SpanStatus::Completed, 6.0);
    let b = tracker.start_span("slow connect", None);
    tracker.complete_span_with_duration(b, SpanStatus::Completed, 3.0);
    assert_eq!(tracker.performance_score(), 70);
}
