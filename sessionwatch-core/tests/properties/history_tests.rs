//! Property-based tests for the bounded history buffer

use proptest::prelude::*;

use sessionwatch_core::BoundedHistory;

proptest! {
    /// Length never exceeds capacity, regardless of how many items arrive
    #[test]
    fn prop_len_bounded_by_capacity(capacity in 1usize..64, items in prop::collection::vec(any::<u32>(), 0..256)) {
        let mut history = BoundedHistory::new(capacity);
        for item in &items {
            history.append(*item);
        }
        prop_assert!(history.len() <= capacity);
        prop_assert_eq!(history.len(), items.len().min(capacity));
    }

    /// The retained contents are exactly the last `capacity` items, oldest-first
    #[test]
    fn prop_retains_suffix_in_order(capacity in 1usize..32, items in prop::collection::vec(any::<i64>(), 0..128)) {
        let mut history = BoundedHistory::new(capacity);
        for item in &items {
            history.append(*item);
        }
        let start = items.len().saturating_sub(capacity);
        prop_assert_eq!(history.snapshot(), items[start..].to_vec());
    }

    /// `latest` always matches the last appended item
    #[test]
    fn prop_latest_is_last_appended(capacity in 1usize..16, items in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut history = BoundedHistory::new(capacity);
        for item in &items {
            history.append(*item);
        }
        prop_assert_eq!(history.latest().copied(), items.last().copied());
    }

    /// `drain` empties the buffer and returns the same view `snapshot` gave
    #[test]
    fn prop_drain_returns_snapshot_and_clears(capacity in 1usize..16, items in prop::collection::vec(any::<u16>(), 0..64)) {
        let mut history = BoundedHistory::new(capacity);
        for item in &items {
            history.append(*item);
        }
        let view = history.snapshot();
        let drained = history.drain();
        prop_assert_eq!(view, drained);
        prop_assert!(history.is_empty());
        prop_assert_eq!(history.capacity(), capacity);
    }

    /// Zero capacity is clamped, so at least one item is always retained
    #[test]
    fn prop_zero_capacity_clamped(items in prop::collection::vec(any::<u32>(), 1..32)) {
        let mut history = BoundedHistory::new(0);
        for item in &items {
            history.append(*item);
        }
        prop_assert_eq!(history.len(), 1);
        prop_assert_eq!(history.latest().copied(), items.last().copied());
    }
}
