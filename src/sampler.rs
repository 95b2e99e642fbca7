use crate::metrics::{now_timestamp_ms, MetricsSample};
use crate::providers::{
    BatteryProvider, CpuProvider, MemoryProvider, NetworkProvider, StorageProvider,
};
use std::time::Instant;
use tracing::trace;

/// Builds one [`MetricsSample`] per tick from the five providers. Owns the
/// providers and therefore every differential baseline.
pub struct Sampler {
    cpu: CpuProvider,
    memory: MemoryProvider,
    network: NetworkProvider,
    storage: StorageProvider,
    battery: BatteryProvider,
    last_timestamp_ms: u128,
}

impl Sampler {
    pub fn new(
        cpu: CpuProvider,
        memory: MemoryProvider,
        network: NetworkProvider,
        storage: StorageProvider,
        battery: BatteryProvider,
    ) -> Self {
        Self {
            cpu,
            memory,
            network,
            storage,
            battery,
            last_timestamp_ms: 0,
        }
    }

    /// Providers backed by the host OS.
    pub fn system() -> Self {
        Self::new(
            CpuProvider::system(),
            MemoryProvider::system(),
            NetworkProvider::system(),
            StorageProvider::system(),
            BatteryProvider::system(),
        )
    }

    pub fn sample(&mut self) -> MetricsSample {
        self.sample_at(Instant::now(), now_timestamp_ms())
    }

    /// `wall_ms` is clamped so timestamps never go backwards, even if the
    /// wall clock is adjusted between ticks.
    pub fn sample_at(&mut self, now: Instant, wall_ms: u128) -> MetricsSample {
        let timestamp_ms = wall_ms.max(self.last_timestamp_ms);
        self.last_timestamp_ms = timestamp_ms;

        let sample = MetricsSample {
            timestamp_ms,
            cpu: self.cpu.sample(),
            memory: self.memory.sample(),
            network: self.network.sample(now),
            storage: self.storage.sample(),
            battery: self.battery.sample(),
        };
        trace!(
            "sampled cpu={:.1}% mem={:.1}% down={:.2}Mbps up={:.2}Mbps",
            sample.cpu.usage_pct,
            sample.memory.usage_pct,
            sample.network.download_mbps,
            sample.network.upload_mbps
        );
        sample
    }
}
