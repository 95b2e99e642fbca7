//! Per-domain counter providers.
//!
//! Each provider owns a raw source (the OS read) and turns its readings into
//! normalized metrics. CPU and network are differential and keep the previous
//! reading as a baseline; memory, storage and battery need a single read.
//! A failing source never surfaces an error: the provider logs it and returns
//! its documented zero tuple.

pub mod battery;
pub mod cpu;
pub mod memory;
pub mod network;
pub mod storage;

pub use self::battery::{BatteryProvider, BatteryRegistry, BatterySource, PowerSourceEntry};
pub use self::cpu::{CpuProvider, CpuSource, CpuTicks};
pub use self::memory::{MemoryProvider, MemorySource, VmStats};
pub use self::network::{InterfaceReading, NetworkProvider, NetworkSource};
pub use self::storage::{StorageProvider, StorageSource, VolumeCapacity};

use crate::error::SourceError;
use tracing::{debug, info, warn};

/// Logs the first failure of a source at `warn` and repeats at `debug`, so a
/// host without a battery does not flood the log every tick.
#[derive(Debug, Default)]
pub(crate) struct FailureLog {
    failing: bool,
}

impl FailureLog {
    pub(crate) fn failed(&mut self, domain: &'static str, err: &SourceError) {
        if self.failing {
            debug!("{} read still failing: {}", domain, err);
        } else {
            warn!("{} read failed, reporting defaults: {}", domain, err);
            self.failing = true;
        }
    }

    pub(crate) fn succeeded(&mut self, domain: &'static str) {
        if self.failing {
            info!("{} readings recovered", domain);
            self.failing = false;
        }
    }
}
