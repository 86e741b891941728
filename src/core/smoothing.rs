//! Temporal smoothing of per-frame bend vectors.
//!
//! Raw per-frame geometry jitters. Bend vectors are averaged over a short
//! fixed-size window before anything downstream sees them; until the window
//! has filled once, no smoothed output is produced at all.

use crate::core::bend::FingerBendVector;
use std::collections::VecDeque;

/// Bounded FIFO of the most recent bend vectors for one tracked hand.
///
/// Owned by a single tracking session. Losing the hand clears the window;
/// a newly detected hand never inherits another session's history.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    window: VecDeque<FingerBendVector>,
    capacity: usize,
}

impl TemporalSmoother {
    /// Create a smoother averaging over `capacity` frames. Capacity is
    /// validated at config load; a zero here is a programming error.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "smoothing window must hold at least 1 frame");
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a fresh vector, evicting the oldest once full.
    pub fn push(&mut self, bends: FingerBendVector) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(bends);
    }

    /// Whether enough frames have accumulated to trust the mean.
    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Element-wise mean of the window, or `None` while still warming up.
    pub fn smoothed(&self) -> Option<FingerBendVector> {
        if !self.is_full() {
            return None;
        }
        let mut sums = [0.0; 5];
        for v in &self.window {
            for (sum, b) in sums.iter_mut().zip(v.as_array()) {
                *sum += b;
            }
        }
        let n = self.window.len() as f64;
        Some(FingerBendVector::new(sums.map(|s| s / n)))
    }

    /// Drop all history. Called on tracking loss.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_two_extremes() {
        let mut smoother = TemporalSmoother::new(2);
        smoother.push(FingerBendVector::new([0.0; 5]));
        smoother.push(FingerBendVector::new([1.0; 5]));

        let mean = smoother.smoothed().expect("window is full");
        assert_eq!(mean, FingerBendVector::new([0.5; 5]));
    }

    #[test]
    fn test_no_output_until_full() {
        let mut smoother = TemporalSmoother::new(5);
        smoother.push(FingerBendVector::new([0.0; 5]));
        smoother.push(FingerBendVector::new([1.0; 5]));

        assert!(!smoother.is_full());
        assert_eq!(smoother.smoothed(), None);
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let mut smoother = TemporalSmoother::new(2);
        smoother.push(FingerBendVector::new([0.0; 5]));
        smoother.push(FingerBendVector::new([0.0; 5]));
        smoother.push(FingerBendVector::new([1.0; 5]));

        assert_eq!(smoother.len(), 2);
        assert_eq!(smoother.smoothed(), Some(FingerBendVector::new([0.5; 5])));
    }

    #[test]
    fn test_clear_restarts_warmup() {
        let mut smoother = TemporalSmoother::new(2);
        smoother.push(FingerBendVector::new([1.0; 5]));
        smoother.push(FingerBendVector::new([1.0; 5]));
        assert!(smoother.is_full());

        smoother.clear();
        assert!(smoother.is_empty());
        assert_eq!(smoother.smoothed(), None);
    }
}
