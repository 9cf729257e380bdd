//! Background tachometer sampling.
//!
//! The RPM history needs samples at a much faster cadence than the polling
//! loop. A dedicated thread reads the tachometer channel at a fixed interval
//! and sends each sample over a channel. The polling loop is the history's
//! only owner: it drains pending samples into it before computing a rate.

use crate::acquisition::AcquisitionError;
use crate::source::types::{BoardKind, ChannelId, SampleSource, SourceError};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on samples queued between drains.
const QUEUE_CAPACITY: usize = 10_000;

enum SamplerMessage {
    Sample(f64),
    Failed(SourceError),
}

/// Handle to a running sampler thread.
pub struct RpmSampler {
    receiver: Receiver<SamplerMessage>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl RpmSampler {
    /// Start sampling `channel` every `interval` on a new thread.
    ///
    /// The thread opens the channel's board on `source` before its first read.
    pub fn spawn(
        source: Box<dyn SampleSource>,
        channel: ChannelId,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("rpm-sampler".to_string())
            .spawn(move || sample_loop(source, channel, interval, sender, flag))?;

        Ok(Self {
            receiver,
            running,
            handle,
        })
    }

    /// Move every pending sample into `sink`, oldest first.
    ///
    /// Returns the number of samples delivered. A source failure on the
    /// sampler thread is returned here, after any samples read before it.
    pub fn drain<F>(&self, mut sink: F) -> Result<usize, AcquisitionError>
    where
        F: FnMut(f64),
    {
        let mut delivered = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(SamplerMessage::Sample(value)) => {
                    sink(value);
                    delivered += 1;
                }
                Ok(SamplerMessage::Failed(err)) => return Err(err.into()),
                Err(TryRecvError::Empty) => return Ok(delivered),
                Err(TryRecvError::Disconnected) => return Err(AcquisitionError::SamplerStopped),
            }
        }
    }

    /// Whether the sampler thread is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        // Disconnecting unblocks a sender waiting on a full queue.
        drop(self.receiver);
        if self.handle.join().is_err() {
            tracing::error!("rpm sampler thread panicked");
        }
    }
}

fn sample_loop(
    mut source: Box<dyn SampleSource>,
    channel: ChannelId,
    interval: Duration,
    sender: Sender<SamplerMessage>,
    running: Arc<AtomicBool>,
) {
    if let Err(err) = source.open(channel.address) {
        let _ = sender.send(SamplerMessage::Failed(err));
        return;
    }
    tracing::debug!(%channel, ?interval, "rpm sampler started");

    let mut next = Instant::now();
    while running.load(Ordering::SeqCst) {
        match source.read_channel(BoardKind::Voltage, channel) {
            Ok(Ok(value)) => {
                if sender.send(SamplerMessage::Sample(value)).is_err() {
                    break;
                }
            }
            Ok(Err(fault)) => {
                tracing::warn!(%channel, %fault, "tachometer fault, sample skipped");
            }
            Err(err) => {
                tracing::error!(%channel, error = %err, "tachometer read failed");
                let _ = sender.send(SamplerMessage::Failed(err));
                break;
            }
        }

        let (deadline, wait) = advance_deadline(next, interval, Instant::now());
        next = deadline;
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
    tracing::debug!(%channel, "rpm sampler stopped");
}

/// Move a fixed-cadence deadline on by one tick.
///
/// Returns the new deadline and the time left until it. A deadline that has
/// already passed is reset to `now`, so missed ticks are dropped rather than
/// read back to back.
fn advance_deadline(deadline: Instant, interval: Duration, now: Instant) -> (Instant, Duration) {
    let next = deadline + interval;
    if next > now {
        (next, next - now)
    } else {
        (now, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ScriptedSource, SensorFault};

    fn drain_until_error(sampler: &RpmSampler, collected: &mut Vec<f64>) -> AcquisitionError {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match sampler.drain(|v| collected.push(v)) {
                Ok(_) => {
                    assert!(Instant::now() < deadline, "sampler never reported an error");
                    thread::sleep(Duration::from_millis(5));
                }
                Err(err) => return err,
            }
        }
    }

    #[test]
    fn test_delivers_samples_in_order_then_reports_failure() {
        let ch = ChannelId::new(0, 0);
        let mut source = ScriptedSource::new();
        source.push_values(ch, [0.0, 1.0, 0.0, 1.0, 0.5]);

        let sampler = RpmSampler::spawn(Box::new(source), ch, Duration::from_millis(1)).unwrap();
        let mut collected = Vec::new();
        let err = drain_until_error(&sampler, &mut collected);

        assert_eq!(collected, vec![0.0, 1.0, 0.0, 1.0, 0.5]);
        assert!(matches!(
            err,
            AcquisitionError::Source(SourceError::Exhausted(_))
        ));
        sampler.stop();
    }

    #[test]
    fn test_faulted_sample_is_skipped() {
        let ch = ChannelId::new(0, 0);
        let mut source = ScriptedSource::new();
        source
            .push_values(ch, [0.0])
            .push(ch, Err(SensorFault::OpenCircuit))
            .push_values(ch, [1.0]);

        let sampler = RpmSampler::spawn(Box::new(source), ch, Duration::from_millis(1)).unwrap();
        let mut collected = Vec::new();
        let err = drain_until_error(&sampler, &mut collected);

        assert_eq!(collected, vec![0.0, 1.0]);
        assert!(matches!(
            err,
            AcquisitionError::Source(SourceError::Exhausted(_))
        ));
        sampler.stop();
    }

    #[test]
    fn test_deadline_on_schedule_sleeps_remainder() {
        let start = Instant::now();
        let interval = Duration::from_millis(20);
        let now = start + Duration::from_millis(5);

        let (next, wait) = advance_deadline(start, interval, now);
        assert_eq!(next, start + interval);
        assert_eq!(wait, Duration::from_millis(15));
    }

    #[test]
    fn test_deadline_resynchronises_when_behind() {
        let start = Instant::now();
        let interval = Duration::from_millis(20);
        // Five ticks late: the missed ticks are not replayed.
        let now = start + Duration::from_millis(100);

        let (next, wait) = advance_deadline(start, interval, now);
        assert_eq!(next, now);
        assert_eq!(wait, Duration::ZERO);

        let (following, wait) = advance_deadline(next, interval, now);
        assert_eq!(following, now + interval);
        assert_eq!(wait, interval);
    }

    #[test]
    fn test_stop_joins_running_thread() {
        let ch = ChannelId::new(0, 0);
        let mut source = ScriptedSource::new();
        source.push_values(ch, std::iter::repeat(0.0).take(100_000));

        let sampler = RpmSampler::spawn(Box::new(source), ch, Duration::from_millis(2)).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(sampler.is_running());
        let delivered = sampler.drain(|_| {}).unwrap();
        assert!(delivered > 0);
        sampler.stop();
    }
}
