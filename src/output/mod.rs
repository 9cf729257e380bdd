//! Result consumers: run log files and the live terminal view.

pub mod log;
pub mod terminal;

// Re-export commonly used types
pub use log::{create_run_log, CsvLog, JsonLinesLog, LogFormat, RecordSink};
pub use terminal::TerminalPresenter;
