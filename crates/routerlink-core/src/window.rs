//! Bounded, ordered sample buffer.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Samples kept per device and series unless configured otherwise.
pub const DEFAULT_WINDOW_CAPACITY: usize = 500;

/// Fixed-capacity FIFO of the most recent samples, oldest first.
///
/// Pushing onto a full window evicts the oldest sample, so a long-running
/// subscription holds a sliding window instead of growing without bound.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> MetricWindow<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_CAPACITY)
    }

    /// A window holding at most `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the one evicted to make room.
    pub fn push(&mut self, sample: T) -> Option<T> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl<T: Clone> MetricWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }
}

impl<T> Default for MetricWindow<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for MetricWindow<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for sample in iter {
            self.push(sample);
        }
    }
}

/// Serialized as a plain sequence, oldest first.
impl<T: Serialize> Serialize for MetricWindow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.samples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_500() {
        let window: MetricWindow<u32> = MetricWindow::default();
        assert_eq!(window.capacity(), 500);
        assert!(window.is_empty());
        assert!(window.latest().is_none());
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let mut window = MetricWindow::new();
        for n in 0..500_u32 {
            assert_eq!(window.push(n), None);
        }
        assert_eq!(window.len(), 500);

        assert_eq!(window.push(500), Some(0));
        assert_eq!(window.len(), 500);
        assert_eq!(window.iter().next(), Some(&1));
        assert_eq!(window.latest(), Some(&500));

        let all = window.to_vec();
        assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut window = MetricWindow::with_capacity(0);
        window.push("a");
        assert_eq!(window.push("b"), Some("a"));
        assert_eq!(window.to_vec(), vec!["b"]);
    }

    #[test]
    fn extend_and_clear() {
        let mut window = MetricWindow::with_capacity(3);
        window.extend(1..=5);
        assert_eq!(window.to_vec(), vec![3, 4, 5]);
        assert_eq!(window.iter().rev().next(), Some(&5));

        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 3);
    }

    #[test]
    fn serializes_as_sequence() {
        let mut window = MetricWindow::with_capacity(2);
        window.extend([1, 2, 3]);
        assert_eq!(serde_json::to_string(&window).ok().as_deref(), Some("[2,3]"));
    }
}
