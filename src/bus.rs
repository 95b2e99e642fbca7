use crate::history::HistoryBuffer;
use crate::metrics::MetricsSample;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out of every appended sample. Receivers that lag lose the oldest
/// notifications; the history buffer stays the source of truth.
pub const STREAM_CAPACITY: usize = 256;

/// Stores each sample, then notifies subscribers. A subscriber woken by a
/// notification always finds that sample in the history.
#[derive(Clone)]
pub struct SamplePublisher {
    buffer: Arc<HistoryBuffer>,
    stream_tx: broadcast::Sender<MetricsSample>,
}

impl SamplePublisher {
    pub fn new(buffer: Arc<HistoryBuffer>, stream_tx: broadcast::Sender<MetricsSample>) -> Self {
        Self { buffer, stream_tx }
    }

    pub fn publish(&self, sample: MetricsSample) {
        self.buffer.append(sample.clone());

        if self.stream_tx.send(sample).is_err() {
            // No subscribers right now; storage already has the sample.
            trace!("No subscribers for appended sample");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        BatteryMetrics, CpuMetrics, MemoryMetrics, NetworkMetrics, StorageMetrics,
    };

    fn sample(ts: u128) -> MetricsSample {
        MetricsSample {
            timestamp_ms: ts,
            cpu: CpuMetrics::idle(),
            memory: MemoryMetrics::default(),
            network: NetworkMetrics::default(),
            storage: StorageMetrics::default(),
            battery: BatteryMetrics::default(),
        }
    }

    #[test]
    fn append_happens_before_notification() {
        let buffer = Arc::new(HistoryBuffer::new(8));
        let (tx, mut rx) = broadcast::channel(4);
        let publisher = SamplePublisher::new(buffer.clone(), tx);

        publisher.publish(sample(42));

        let notified = rx.try_recv().unwrap();
        assert_eq!(notified.timestamp_ms, 42);
        assert_eq!(buffer.latest().unwrap(), notified);
    }

    #[test]
    fn publishing_without_subscribers_still_stores() {
        let buffer = Arc::new(HistoryBuffer::new(8));
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        SamplePublisher::new(buffer.clone(), tx).publish(sample(7));
        assert_eq!(buffer.len(), 1);
    }
}
