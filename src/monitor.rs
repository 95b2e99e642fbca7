use crate::bus::{SamplePublisher, STREAM_CAPACITY};
use crate::error::MonitorError;
use crate::history::HistoryBuffer;
use crate::metrics::MetricsSample;
use crate::sampler::Sampler;
use crate::scheduler::Scheduler;
use crate::settings::{DisplayedMetric, MonitorSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Read side of the monitor plus the configuration entry points. Cheap to
/// clone and safe to use from any task or thread.
#[derive(Clone)]
pub struct MonitorHandle {
    history: Arc<HistoryBuffer>,
    stream_tx: broadcast::Sender<MetricsSample>,
    settings: Arc<MonitorSettings>,
    interval_tx: Arc<watch::Sender<Duration>>,
}

impl MonitorHandle {
    pub fn latest(&self) -> Option<MetricsSample> {
        self.history.latest()
    }

    /// Oldest first, at most the history capacity.
    pub fn history(&self) -> Vec<MetricsSample> {
        self.history.all()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Receives every sample after it has been appended to the history.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricsSample> {
        self.stream_tx.subscribe()
    }

    pub fn update_interval(&self) -> f64 {
        self.settings.update_interval()
    }

    /// Clamps, persists, and reschedules a running scheduler. Returns the
    /// interval actually applied. A failed write to the store is logged and
    /// the interval is applied anyway.
    pub fn set_update_interval(&self, secs: f64) -> f64 {
        let applied = match self.settings.set_update_interval(secs) {
            Ok(applied) => applied,
            Err(e) => {
                warn!("Failed to persist update interval: {}", e);
                crate::settings::clamp_interval(secs)
            }
        };
        self.interval_tx
            .send_replace(Duration::from_secs_f64(applied));
        applied
    }

    pub fn displayed_metric(&self) -> DisplayedMetric {
        self.settings.displayed_metric()
    }

    pub fn set_displayed_metric(&self, metric: DisplayedMetric) {
        if let Err(e) = self.settings.set_displayed_metric(metric) {
            warn!("Failed to persist displayed metric: {}", e);
        }
    }

    /// Compact text for the displayed metric of the latest sample.
    pub fn headline(&self) -> String {
        self.displayed_metric().headline(self.latest().as_ref())
    }
}

/// Owns the scheduler lifecycle: `Idle -> Running` on [`Monitor::start`],
/// back to `Idle` on [`Monitor::stop`].
pub struct Monitor {
    handle: MonitorHandle,
    sampler: Option<Sampler>,
    running: Option<(CancellationToken, JoinHandle<Sampler>)>,
}

impl Monitor {
    pub fn new(sampler: Sampler, settings: MonitorSettings, capacity: usize) -> Self {
        let settings = Arc::new(settings);
        let (stream_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let (interval_tx, _) = watch::channel(settings.update_interval_duration());
        Self {
            handle: MonitorHandle {
                history: Arc::new(HistoryBuffer::new(capacity)),
                stream_tx,
                settings,
                interval_tx: Arc::new(interval_tx),
            },
            sampler: Some(sampler),
            running: None,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Spawns the scheduler on the current tokio runtime. The interval is
    /// re-read from the settings store on every start.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.running.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }
        let Some(sampler) = self.sampler.take() else {
            return Err(MonitorError::SamplerLost);
        };

        let interval = self.handle.settings.update_interval_duration();
        self.handle.interval_tx.send_replace(interval);

        let publisher = SamplePublisher::new(
            self.handle.history.clone(),
            self.handle.stream_tx.clone(),
        );
        let scheduler = Scheduler::new(sampler, publisher, self.handle.interval_tx.subscribe());
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { scheduler.run(task_cancel).await });

        self.running = Some((cancel, task));
        Ok(())
    }

    /// Cancels the schedule and waits for the in-flight tick, if any. If the
    /// scheduler task panicked the sampler is gone and later starts fail
    /// with [`MonitorError::SamplerLost`].
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let Some((cancel, task)) = self.running.take() else {
            return Err(MonitorError::NotRunning);
        };
        cancel.cancel();
        let sampler = task.await.map_err(|e| {
            warn!("Scheduler task failed: {}", e);
            MonitorError::Join(e)
        })?;
        self.sampler = Some(sampler);
        info!("Monitor stopped with {} samples retained", self.handle.history.len());
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.running.take() {
            cancel.cancel();
        }
    }
}
