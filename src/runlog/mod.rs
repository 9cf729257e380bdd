//! Run bookkeeping for the acquisition loop.

pub mod counters;

// Re-export commonly used types
pub use counters::{load_persisted, PersistedCounters, RunLog, RunStats};
