//! Fixed-capacity FIFO retention buffer
//!
//! Every component that keeps rolling samples (latency windows, command
//! history, recent errors, bottlenecks) retains them through a
//! [`BoundedHistory`] so memory stays bounded regardless of session lifetime.

use std::collections::VecDeque;

/// A fixed-capacity FIFO ring buffer.
///
/// Appending past capacity evicts the oldest entry. Capacity is fixed at
/// construction and never changes; a requested capacity of zero is clamped
/// to one so `append` always retains at least the newest entry.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Creates a new history retaining at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest one when full
    pub fn append(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Returns and clears all retained entries, oldest-first
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Returns a read-only copy of the retained entries, oldest-first
    #[must_use]
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }

    /// Iterates over retained entries, oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns the most recently appended entry
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Returns the number of retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the fixed capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<'a, T> IntoIterator for &'a BoundedHistory<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
