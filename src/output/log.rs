//! Run log writers.
//!
//! Every record is flushed as soon as it is written so the log on disk is
//! current even if the process is killed mid-run.

use crate::record::{CycleRecord, RunHeader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// On-disk format of a run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Header row plus one comma-separated line per cycle
    Csv,
    /// Run header object plus one JSON object per cycle
    Jsonl,
}

impl LogFormat {
    pub fn extension(self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(LogFormat::Csv),
            "jsonl" | "json-lines" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{other}' (expected csv or jsonl)")),
        }
    }
}

/// Consumer of a run's records.
pub trait RecordSink {
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()>;
    fn write_record(&mut self, record: &CycleRecord) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// CSV run log.
pub struct CsvLog<W: Write> {
    out: W,
}

impl<W: Write> CsvLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for CsvLog<W> {
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()> {
        writeln!(self.out, "{}", header.columns.join(","))?;
        self.out.flush()
    }

    fn write_record(&mut self, record: &CycleRecord) -> io::Result<()> {
        writeln!(self.out, "{}", record.to_csv_line())?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// JSON-lines run log.
pub struct JsonLinesLog<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for JsonLinesLog<W> {
    fn write_header(&mut self, header: &RunHeader) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, header)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn write_record(&mut self, record: &CycleRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Create a new log file in `dir` for the run described by `header`.
///
/// The header is written before returning.
pub fn create_run_log(
    dir: &Path,
    format: LogFormat,
    header: &RunHeader,
) -> io::Result<(PathBuf, Box<dyn RecordSink>)> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!(
        "run_{}.{}",
        header.started_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    ));
    let file = BufWriter::new(File::create(&path)?);

    let mut sink: Box<dyn RecordSink> = match format {
        LogFormat::Csv => Box::new(CsvLog::new(file)),
        LogFormat::Jsonl => Box::new(JsonLinesLog::new(file)),
    };
    sink.write_header(header)?;

    Ok((path, sink))
}
