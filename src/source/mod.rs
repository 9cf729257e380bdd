//! Raw sample acquisition boundary.
//!
//! A [`SampleSource`] produces one reading per call for a board channel.
//! Hardware drivers live outside this crate; the crate ships a synthetic
//! source for running without boards and a scripted source for playback.

pub mod scripted;
pub mod simulated;
pub mod types;

// Re-export commonly used types
pub use scripted::ScriptedSource;
pub use simulated::{SimulatedConfig, SimulatedSource};
pub use types::{
    BoardKind, ChannelId, Reading, SampleSource, SensorFault, SourceError, ThermocoupleType,
};

use crate::config::Config;

/// Open the sample source selected for a run.
///
/// Only the simulated source is built in. Without it, acquisition has no
/// board driver to talk to and this returns [`SourceError::Unavailable`].
pub fn open_source(config: &Config, simulate: bool) -> Result<Box<dyn SampleSource>, SourceError> {
    if simulate {
        Ok(Box::new(SimulatedSource::new(SimulatedConfig::from_config(
            config,
        ))))
    } else {
        Err(SourceError::Unavailable(
            "no board driver is linked into this build; run with --simulate".to_string(),
        ))
    }
}
