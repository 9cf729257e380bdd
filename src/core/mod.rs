//! Core signal processing for the DAQ monitor.
//!
//! This module contains:
//! - A fixed-capacity circular reading window
//! - Per-channel steady/transient classification
//! - Rising-edge RPM estimation
//! - Pressure transducer conversion

pub mod classifier;
pub mod pressure;
pub mod rpm;
pub mod stats;
pub mod window;

// Re-export commonly used types
pub use classifier::{
    Classification, ClassifierBank, ClassifierState, DeviationClassifier,
    DEFAULT_DEVIATION_THRESHOLD, DEFAULT_WINDOW_SIZE,
};
pub use pressure::{PressureCalibration, PressureReading};
pub use rpm::{EdgeCountEstimator, DEFAULT_EDGE_THRESHOLD, DEFAULT_RATE_SCALE_FACTOR};
pub use stats::population_std_dev;
pub use window::ReadingWindow;
