use crate::bus::SamplePublisher;
use crate::sampler::Sampler;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Drives the sampler. Runs as a single task, so ticks never overlap and the
/// sampler (with every provider baseline) is only ever touched from here.
pub struct Scheduler {
    sampler: Sampler,
    publisher: SamplePublisher,
    interval_rx: watch::Receiver<Duration>,
}

impl Scheduler {
    pub fn new(
        sampler: Sampler,
        publisher: SamplePublisher,
        interval_rx: watch::Receiver<Duration>,
    ) -> Self {
        Self {
            sampler,
            publisher,
            interval_rx,
        }
    }

    /// Samples immediately, then every interval until cancelled. An interval
    /// change replaces the schedule: the next tick fires one new interval
    /// after the change, without a tick being forced in between.
    ///
    /// Hands the sampler back so a restart keeps its baselines.
    pub async fn run(mut self, cancel: CancellationToken) -> Sampler {
        let mut period = *self.interval_rx.borrow_and_update();
        let mut ticker = schedule(Instant::now(), period);
        let mut watching = true;

        info!("Scheduler started with interval {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    break;
                }
                // A tick that is already due is taken before a reschedule.
                _ = ticker.tick() => {
                    let sample = self.sampler.sample();
                    trace!("tick at {}", sample.timestamp_ms);
                    self.publisher.publish(sample);
                }
                changed = self.interval_rx.changed(), if watching => {
                    if changed.is_err() {
                        // Sender dropped; keep the current cadence.
                        watching = false;
                        continue;
                    }
                    let next = *self.interval_rx.borrow_and_update();
                    if next != period {
                        info!("Rescheduling: interval {:?} -> {:?}", period, next);
                        period = next;
                        ticker = schedule(Instant::now() + period, period);
                    }
                }
            }
        }

        info!("Scheduler stopped");
        self.sampler
    }
}

fn schedule(start: Instant, period: Duration) -> Interval {
    // interval_at panics on a zero period.
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(start, period);
    // A late tick shifts the cadence instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
