//! SteadyState DAQ - steady-state detection for multi-board acquisition.
//!
//! This library polls thermocouple and voltage boards on a fixed cadence,
//! classifies every monitored channel as steady or transient from the spread
//! of its recent readings, and estimates shaft speed from a tachometer
//! channel by counting rising edges.
//!
//! # Classification
//!
//! - **Rolling window**: each channel keeps its last `W` readings (1800 by default)
//! - **Deviation**: population standard deviation over the full window
//! - **Steady**: deviation strictly below the threshold (0.33 by default)
//! - **Warm-up**: channels report transient until their window has filled
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SteadyState DAQ                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│ Acquisition │──▶│   Output    │       │
//! │  │ (boards)    │   │ (classify)  │   │ (log, tty)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 ▲                  │              │
//! │         ▼                 │                  ▼              │
//! │  ┌─────────────┐          │          ┌─────────────┐       │
//! │  │ RPM Sampler │──────────┘          │  Run Log    │       │
//! │  │  (thread)   │                     │ (counters)  │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use steadystate_daq::{config::Config, source, Acquisition};
//!
//! let config = Config::default();
//! let mut source = source::open_source(&config, true).expect("simulated source");
//!
//! let mut acquisition = Acquisition::new(&config);
//! acquisition.setup(source.as_mut()).expect("board setup");
//!
//! let record = acquisition.poll(source.as_mut()).expect("poll");
//! println!("{}", record.to_csv_line());
//! ```

pub mod acquisition;
pub mod config;
pub mod core;
pub mod output;
pub mod record;
pub mod runlog;
pub mod sampler;
pub mod source;

// Re-export key types at crate root for convenience
pub use acquisition::{Acquisition, AcquisitionError, ChannelSlot};
pub use config::{Config, ConfigError};
pub use core::{
    population_std_dev, Classification, ClassifierBank, DeviationClassifier, EdgeCountEstimator,
    ReadingWindow,
};
pub use output::{LogFormat, RecordSink, TerminalPresenter};
pub use record::{CycleRecord, RecordBuilder, RunHeader};
pub use runlog::{RunLog, RunStats};
pub use sampler::RpmSampler;
pub use source::{ChannelId, SampleSource, SensorFault, SourceError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
