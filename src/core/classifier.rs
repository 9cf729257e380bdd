//! Steady/transient classification of a channel's recent readings.
//!
//! Each channel owns a [`DeviationClassifier`]. Readings are written into a
//! fixed-size circular window; once the window has been filled, every new
//! reading triggers a fresh population standard deviation over the whole
//! window, which is compared against the deviation threshold.
//!
//! Until the first fill the classifier reports [`Classification::Transient`].

use crate::core::stats::population_std_dev;
use crate::core::window::ReadingWindow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window length used by the reference installation (30 minutes at 1 Hz).
pub const DEFAULT_WINDOW_SIZE: usize = 1800;

/// Deviation below which a channel counts as steady.
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 0.33;

/// Two-valued output of a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Steady,
    Transient,
}

impl Classification {
    pub fn is_steady(self) -> bool {
        self == Classification::Steady
    }

    /// Single-letter flag written to the CSV log (`Y` = steady).
    pub fn log_flag(self) -> &'static str {
        match self {
            Classification::Steady => "Y",
            Classification::Transient => "N",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Steady => write!(f, "steady"),
            Classification::Transient => write!(f, "transient"),
        }
    }
}

/// Lifecycle of a classifier. The transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    /// Window not yet filled; classification defaults to transient
    Filling,
    /// Window filled at least once; every ingest reclassifies
    Classifying,
}

/// Per-channel rolling-window deviation classifier.
#[derive(Debug, Clone)]
pub struct DeviationClassifier {
    window: ReadingWindow,
    threshold: f64,
    /// Deviation of the window after the latest ingest, once classifying
    deviation: Option<f64>,
}

impl DeviationClassifier {
    /// Create a classifier with the given window size and threshold.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn new(window_size: usize, threshold: f64) -> Self {
        Self {
            window: ReadingWindow::new(window_size),
            threshold,
            deviation: None,
        }
    }

    /// Insert a reading and return the resulting classification.
    pub fn ingest(&mut self, value: f64) -> Classification {
        self.window.push(value);
        if self.window.is_filled() {
            self.deviation = Some(population_std_dev(self.window.as_slice()));
        }
        self.classification()
    }

    /// Classification as of the latest ingest.
    pub fn classification(&self) -> Classification {
        match self.deviation {
            Some(sigma) if sigma < self.threshold => Classification::Steady,
            _ => Classification::Transient,
        }
    }

    pub fn state(&self) -> ClassifierState {
        if self.window.is_filled() {
            ClassifierState::Classifying
        } else {
            ClassifierState::Filling
        }
    }

    /// Whether the window has been filled at least once.
    pub fn can_classify(&self) -> bool {
        self.window.is_filled()
    }

    /// Most recently computed deviation, `None` while filling.
    pub fn deviation(&self) -> Option<f64> {
        self.deviation
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn window(&self) -> &ReadingWindow {
        &self.window
    }
}

impl Default for DeviationClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_DEVIATION_THRESHOLD)
    }
}

/// A fixed set of classifiers, one per channel slot.
///
/// Slots are dense indices assigned by the caller (usually the position of
/// a channel in the configured board layout).
#[derive(Debug, Clone)]
pub struct ClassifierBank {
    classifiers: Vec<DeviationClassifier>,
}

impl ClassifierBank {
    pub fn new(channels: usize, window_size: usize, threshold: f64) -> Self {
        Self {
            classifiers: (0..channels)
                .map(|_| DeviationClassifier::new(window_size, threshold))
                .collect(),
        }
    }

    /// Feed a reading to the classifier in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn ingest(&mut self, slot: usize, value: f64) -> Classification {
        self.classifiers[slot].ingest(value)
    }

    pub fn get(&self, slot: usize) -> Option<&DeviationClassifier> {
        self.classifiers.get(slot)
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Number of channels whose window has been filled.
    pub fn classifying_count(&self) -> usize {
        self.classifiers.iter().filter(|c| c.can_classify()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_transient_while_filling() {
        let mut classifier = DeviationClassifier::new(10, 0.33);
        for _ in 0..9 {
            assert_eq!(classifier.ingest(20.0), Classification::Transient);
        }
        assert_eq!(classifier.state(), ClassifierState::Filling);
        assert_eq!(classifier.deviation(), None);
    }

    #[test]
    fn test_identical_values_are_steady_once_filled() {
        let mut classifier = DeviationClassifier::new(10, 0.33);
        let mut last = Classification::Transient;
        for _ in 0..10 {
            last = classifier.ingest(-273.15);
        }
        assert_eq!(last, Classification::Steady);
        assert!(classifier.deviation().unwrap() < 1e-9);
        assert_eq!(classifier.state(), ClassifierState::Classifying);
    }

    #[test]
    fn test_alternating_values_are_transient() {
        let mut classifier = DeviationClassifier::new(8, 0.33);
        for i in 0..8 {
            let v = if i % 2 == 0 { 5.0 } else { 105.0 };
            classifier.ingest(v);
        }
        assert!(classifier.can_classify());
        assert_eq!(classifier.classification(), Classification::Transient);
        assert!((classifier.deviation().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_transition_on_window_size_th_insert() {
        let w = 5;
        let mut classifier = DeviationClassifier::new(w, 0.33);
        let mut transitions = 0;
        for i in 0..=w {
            let before = classifier.can_classify();
            classifier.ingest(1.0);
            if !before && classifier.can_classify() {
                transitions += 1;
                assert_eq!(i, w - 1);
            }
        }
        assert_eq!(transitions, 1);
    }

    #[test]
    fn test_reclassifies_on_every_ingest() {
        let mut classifier = DeviationClassifier::new(4, 0.33);
        for _ in 0..4 {
            classifier.ingest(10.0);
        }
        assert_eq!(classifier.classification(), Classification::Steady);

        // One large outlier makes the window transient.
        assert_eq!(classifier.ingest(30.0), Classification::Transient);

        // It stays in the window until pushed out by four newer readings.
        for _ in 0..3 {
            assert_eq!(classifier.ingest(10.0), Classification::Transient);
        }
        assert_eq!(classifier.ingest(10.0), Classification::Steady);
    }

    #[test]
    fn test_threshold_is_strict() {
        // [0, 0.66] has population deviation 0.33 exactly.
        let mut classifier = DeviationClassifier::new(2, 0.33);
        classifier.ingest(0.0);
        assert_eq!(classifier.ingest(0.66), Classification::Transient);

        let mut classifier = DeviationClassifier::new(2, 0.34);
        classifier.ingest(0.0);
        assert_eq!(classifier.ingest(0.66), Classification::Steady);
    }

    #[test]
    fn test_bank_isolates_channels() {
        let mut bank = ClassifierBank::new(2, 3, 0.33);
        for _ in 0..3 {
            bank.ingest(0, 1.0);
        }
        bank.ingest(1, 1.0);

        assert_eq!(bank.len(), 2);
        assert_eq!(bank.classifying_count(), 1);
        assert_eq!(bank.get(0).unwrap().classification(), Classification::Steady);
        assert_eq!(bank.get(1).unwrap().classification(), Classification::Transient);
        assert!(bank.get(2).is_none());
    }

    #[test]
    fn test_log_flags() {
        assert_eq!(Classification::Steady.log_flag(), "Y");
        assert_eq!(Classification::Transient.log_flag(), "N");
        assert_eq!(Classification::Steady.to_string(), "steady");
    }
}
