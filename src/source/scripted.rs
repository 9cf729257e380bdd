//! Sample source that replays pre-recorded readings per channel.

use crate::source::types::{
    BoardKind, ChannelId, Reading, SampleSource, SourceError, ThermocoupleType,
};
use std::collections::{HashMap, VecDeque};

enum Scripted {
    Reading(Reading),
    HardwareError(i32),
}

/// Plays back queued readings in order; an empty queue is an error.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: HashMap<ChannelId, VecDeque<Scripted>>,
    opened: Vec<u8>,
    configured: Vec<(ChannelId, ThermocoupleType)>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reading (value or fault) for a channel.
    pub fn push(&mut self, channel: ChannelId, reading: Reading) -> &mut Self {
        self.queue(channel).push_back(Scripted::Reading(reading));
        self
    }

    /// Queue a run of plain values for a channel.
    pub fn push_values<I>(&mut self, channel: ChannelId, values: I) -> &mut Self
    where
        I: IntoIterator<Item = f64>,
    {
        let queue = self.queue(channel);
        queue.extend(values.into_iter().map(|v| Scripted::Reading(Ok(v))));
        self
    }

    /// Queue a read failure with the given board error code.
    pub fn push_hardware_error(&mut self, channel: ChannelId, code: i32) -> &mut Self {
        self.queue(channel).push_back(Scripted::HardwareError(code));
        self
    }

    /// Board addresses opened so far, in call order.
    pub fn opened(&self) -> &[u8] {
        &self.opened
    }

    /// Thermocouple channels configured so far, in call order.
    pub fn configured(&self) -> &[(ChannelId, ThermocoupleType)] {
        &self.configured
    }

    fn queue(&mut self, channel: ChannelId) -> &mut VecDeque<Scripted> {
        self.scripts.entry(channel).or_default()
    }
}

impl SampleSource for ScriptedSource {
    fn open(&mut self, address: u8) -> Result<(), SourceError> {
        self.opened.push(address);
        Ok(())
    }

    fn configure_thermocouple(
        &mut self,
        channel: ChannelId,
        tc_type: ThermocoupleType,
    ) -> Result<(), SourceError> {
        self.configured.push((channel, tc_type));
        Ok(())
    }

    fn read_channel(
        &mut self,
        _kind: BoardKind,
        channel: ChannelId,
    ) -> Result<Reading, SourceError> {
        match self.scripts.get_mut(&channel).and_then(VecDeque::pop_front) {
            Some(Scripted::Reading(reading)) => Ok(reading),
            Some(Scripted::HardwareError(code)) => Err(SourceError::Hardware {
                address: channel.address,
                channel: channel.channel,
                code,
            }),
            None => Err(SourceError::Exhausted(channel)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::SensorFault;

    #[test]
    fn test_plays_back_in_order() {
        let ch = ChannelId::new(2, 0);
        let mut source = ScriptedSource::new();
        source
            .push_values(ch, [1.0, 2.0])
            .push(ch, Err(SensorFault::OverRange));

        assert_eq!(source.read_channel(BoardKind::Thermocouple, ch).unwrap(), Ok(1.0));
        assert_eq!(source.read_channel(BoardKind::Thermocouple, ch).unwrap(), Ok(2.0));
        assert_eq!(
            source.read_channel(BoardKind::Thermocouple, ch).unwrap(),
            Err(SensorFault::OverRange)
        );
        assert!(matches!(
            source.read_channel(BoardKind::Thermocouple, ch),
            Err(SourceError::Exhausted(_))
        ));
    }

    #[test]
    fn test_hardware_error() {
        let ch = ChannelId::new(0, 3);
        let mut source = ScriptedSource::new();
        source.push_hardware_error(ch, -7);
        assert!(matches!(
            source.read_channel(BoardKind::Voltage, ch),
            Err(SourceError::Hardware { code: -7, .. })
        ));
    }
}
