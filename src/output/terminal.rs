//! Live terminal view of each cycle.
//!
//! Classified channels are shown on a green background when steady and a red
//! one when transient. Columns are separated by ` |`.

use crate::record::{ChannelReading, CycleRecord, ReadingValue};
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

/// Renders cycle records as single terminal lines.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl TerminalPresenter {
    pub fn new() -> Self {
        Self
    }

    /// Render one record, without a trailing newline.
    pub fn render(&self, record: &CycleRecord) -> String {
        let mut line = String::new();

        for reading in &record.readings {
            line.push_str(&render_reading(reading).to_string());
            line.push_str(" |");
        }
        if let Some(rpm) = record.rpm {
            line.push_str(&format!(" {rpm:>4.0} |"));
        }
        if let Some(pressure) = record.pressure {
            line.push_str(&format!(
                "{:>10.7} mA |  {:>5.2} psi |",
                pressure.current_ma, pressure.psi
            ));
        } else if let Some(fault) = record.pressure_fault {
            line.push_str(&format!(" {} |", fault.label().yellow()));
        }
        line
    }

    pub fn present<W: Write>(&self, record: &CycleRecord, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.render(record))
    }
}

fn render_reading(reading: &ChannelReading) -> ColoredString {
    let text = match reading.value {
        ReadingValue::Value(v) => format!(" {v:>5.2}"),
        ReadingValue::Fault(fault) => format!(" {}", fault.label()),
    };

    match reading.classification {
        Some(c) if c.is_steady() => text.black().on_green(),
        Some(_) => text.black().on_red(),
        None if reading.value.fault().is_some() => text.yellow(),
        None => text.normal(),
    }
}
