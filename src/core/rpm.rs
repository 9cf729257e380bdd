//! Rotational speed from a sampled tachometer waveform.
//!
//! Samples are pushed into a fixed-capacity history. A rate is derived by
//! counting rising edges across a threshold and multiplying by a scale factor
//! that converts "edges per history span" into revolutions per minute.

use crate::core::window::ReadingWindow;

/// Threshold (volts) a sample must reach to count as the high half of an edge.
pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.2;

/// Edges-to-RPM factor for a 6 second history span.
pub const DEFAULT_RATE_SCALE_FACTOR: f64 = 10.0;

/// Rising-edge counter over a rolling sample history.
#[derive(Debug, Clone)]
pub struct EdgeCountEstimator {
    history: ReadingWindow,
    threshold: f64,
    scale_factor: f64,
}

impl EdgeCountEstimator {
    /// Create an estimator keeping `capacity` samples.
    ///
    /// `threshold` must be positive. Before the history first wraps only the
    /// samples written so far are scanned, which agrees with a scan over
    /// zero-filled storage only while zero sits below the threshold.
    /// `Config::validate` enforces this for configured estimators.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, threshold: f64, scale_factor: f64) -> Self {
        Self {
            history: ReadingWindow::new(capacity),
            threshold,
            scale_factor,
        }
    }

    /// Append a sample, overwriting the oldest once the history is full.
    pub fn ingest(&mut self, value: f64) {
        self.history.push(value);
    }

    /// Number of rising edges in the history, scanned oldest to newest.
    ///
    /// An edge is a consecutive pair with `prev < threshold && cur >= threshold`.
    pub fn edge_count(&self) -> u32 {
        let mut samples = self.history.iter_chronological();
        let Some(mut prev) = samples.next() else {
            return 0;
        };

        let mut edges = 0;
        for cur in samples {
            if prev < self.threshold && cur >= self.threshold {
                edges += 1;
            }
            prev = cur;
        }
        edges
    }

    /// Rate derived from the current history. Does not mutate state.
    pub fn compute_rate(&self) -> f64 {
        self.edge_count() as f64 * self.scale_factor
    }

    /// Number of samples written so far, capped at capacity.
    pub fn sample_len(&self) -> usize {
        self.history.len()
    }

    pub fn capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Whether the history has been completely written at least once.
    pub fn is_filled(&self) -> bool {
        self.history.is_filled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn estimator_with(samples: &[f64]) -> EdgeCountEstimator {
        let mut estimator = EdgeCountEstimator::new(samples.len(), 0.2, 10.0);
        for &s in samples {
            estimator.ingest(s);
        }
        estimator
    }

    #[test]
    fn test_counts_rising_edges() {
        let estimator = estimator_with(&[0.0, 0.0, 0.3, 0.3, 0.1, 0.25]);
        assert_eq!(estimator.edge_count(), 2);
        assert_eq!(estimator.compute_rate(), 20.0);
    }

    #[test]
    fn test_value_at_threshold_is_not_an_edge() {
        let estimator = estimator_with(&[0.2, 0.2]);
        assert_eq!(estimator.edge_count(), 0);
    }

    #[test]
    fn test_rise_to_exact_threshold_counts() {
        let estimator = estimator_with(&[0.1, 0.2]);
        assert_eq!(estimator.edge_count(), 1);
    }

    #[test]
    fn test_empty_and_single_sample() {
        let estimator = EdgeCountEstimator::new(8, 0.2, 10.0);
        assert_eq!(estimator.compute_rate(), 0.0);

        let estimator = estimator_with(&[5.0]);
        assert_eq!(estimator.compute_rate(), 0.0);
    }

    #[test]
    fn test_partial_history_ignores_unwritten_slots() {
        let mut estimator = EdgeCountEstimator::new(10, 0.2, 10.0);
        for s in [0.0, 1.0, 0.0, 1.0] {
            estimator.ingest(s);
        }
        assert!(!estimator.is_filled());
        assert_eq!(estimator.sample_len(), 4);
        assert_eq!(estimator.edge_count(), 2);
    }

    #[test]
    fn test_wrapped_history_scans_chronologically() {
        let mut estimator = EdgeCountEstimator::new(4, 0.2, 10.0);
        // Slots end up as [1.0, 0.0, 0.0, 0.0] with the cursor at 1, so slot
        // order would see no rise, while time order is 0, 0, 0, 1.
        for s in [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0] {
            estimator.ingest(s);
        }
        assert_eq!(estimator.edge_count(), 1);
    }

    #[test]
    fn test_wrapped_history_drops_oldest_edge() {
        let mut estimator = EdgeCountEstimator::new(4, 0.2, 10.0);
        for s in [0.0, 1.0, 1.0, 1.0, 1.0] {
            estimator.ingest(s);
        }
        // The only rise (0 -> 1) fell off when the first sample was overwritten.
        assert_eq!(estimator.edge_count(), 0);
    }

    #[test]
    fn test_scale_factor_is_configurable() {
        let mut estimator = EdgeCountEstimator::new(4, 0.5, 60.0);
        for s in [0.0, 1.0, 0.0, 1.0] {
            estimator.ingest(s);
        }
        assert_eq!(estimator.compute_rate(), 120.0);
    }

    /// Edge count over every slot of a zero-initialized buffer, unwritten
    /// slots included.
    fn zero_filled_edge_count(samples: &[f64], capacity: usize, threshold: f64) -> u32 {
        let mut slots = vec![0.0; capacity];
        slots[..samples.len()].copy_from_slice(samples);
        slots
            .windows(2)
            .filter(|pair| pair[0] < threshold && pair[1] >= threshold)
            .count() as u32
    }

    #[test]
    fn test_partial_history_matches_zero_filled_scan() {
        let samples = [-1.0, 0.5, 0.0];
        let mut estimator = EdgeCountEstimator::new(6, 0.2, 10.0);
        for &s in &samples {
            estimator.ingest(s);
        }
        assert_eq!(estimator.edge_count(), zero_filled_edge_count(&samples, 6, 0.2));
    }

    proptest! {
        #[test]
        fn partial_history_agrees_with_zero_filled_scan(
            samples in prop::collection::vec(-1.0f64..1.0, 1..32),
            extra in 0usize..8,
            threshold in 0.01f64..1.0,
        ) {
            let capacity = samples.len() + extra;
            let mut estimator = EdgeCountEstimator::new(capacity, threshold, 10.0);
            for &s in &samples {
                estimator.ingest(s);
            }
            prop_assert_eq!(
                estimator.edge_count(),
                zero_filled_edge_count(&samples, capacity, threshold)
            );
        }

        #[test]
        fn compute_rate_is_idempotent(samples in prop::collection::vec(-1.0f64..1.0, 1..200)) {
            let estimator = estimator_with(&samples);
            let first = estimator.compute_rate();
            let second = estimator.compute_rate();
            prop_assert_eq!(first, second);
        }
    }
}
