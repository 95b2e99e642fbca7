#![allow(dead_code)]

use host_monitor::error::SourceError;
use host_monitor::providers::{
    BatteryProvider, BatteryRegistry, BatterySource, CpuProvider, CpuSource, CpuTicks,
    InterfaceReading, MemoryProvider, MemorySource, NetworkProvider, NetworkSource,
    PowerSourceEntry, StorageProvider, StorageSource, VmStats, VolumeCapacity,
};
use host_monitor::sampler::Sampler;

/// Every read advances user by 30 ticks and idle by 70.
pub struct SteadyCpu {
    reads: u64,
}

impl CpuSource for SteadyCpu {
    fn read_ticks(&mut self) -> Result<CpuTicks, SourceError> {
        self.reads += 1;
        Ok(CpuTicks {
            user: self.reads * 30,
            system: 0,
            idle: self.reads * 70,
            nice: 0,
        })
    }
}

/// Panics on its second read, taking the scheduler task down with it.
pub struct FailingCpu {
    reads: u64,
}

impl CpuSource for FailingCpu {
    fn read_ticks(&mut self) -> Result<CpuTicks, SourceError> {
        self.reads += 1;
        assert!(self.reads < 2, "cpu source crashed");
        Ok(CpuTicks::default())
    }
}

pub struct HalfFull;

impl MemorySource for HalfFull {
    fn read_vm_stats(&mut self) -> Result<VmStats, SourceError> {
        Ok(VmStats {
            page_size: 4096,
            free: 1000,
            active: 1000,
            ..Default::default()
        })
    }
}

pub struct OneInterface {
    rx: u64,
}

impl NetworkSource for OneInterface {
    fn read_interfaces(&mut self) -> Result<Vec<InterfaceReading>, SourceError> {
        self.rx += 1_048_576;
        Ok(vec![InterfaceReading {
            name: "en0".to_string(),
            is_up: true,
            is_running: true,
            is_loopback: false,
            rx_bytes: self.rx,
            tx_bytes: 0,
            ipv4: vec!["10.0.0.7".parse().unwrap()],
        }])
    }
}

pub struct FixedDisk;

impl StorageSource for FixedDisk {
    fn read_root_volume(&mut self) -> Result<VolumeCapacity, SourceError> {
        Ok(VolumeCapacity {
            total_bytes: 500_000_000_000,
            available_bytes: 125_000_000_000,
        })
    }
}

pub struct NoBattery;

impl BatterySource for NoBattery {
    fn power_sources(&mut self) -> Result<Vec<PowerSourceEntry>, SourceError> {
        Ok(vec![])
    }

    fn registry(&mut self) -> Result<Option<BatteryRegistry>, SourceError> {
        Ok(None)
    }
}

pub fn fake_sampler() -> Sampler {
    Sampler::new(
        CpuProvider::new(Box::new(SteadyCpu { reads: 0 })),
        MemoryProvider::new(Box::new(HalfFull)),
        NetworkProvider::new(Box::new(OneInterface { rx: 0 })),
        StorageProvider::new(Box::new(FixedDisk)),
        BatteryProvider::new(Box::new(NoBattery)),
    )
}

pub fn crashing_sampler() -> Sampler {
    Sampler::new(
        CpuProvider::new(Box::new(FailingCpu { reads: 0 })),
        MemoryProvider::new(Box::new(HalfFull)),
        NetworkProvider::new(Box::new(OneInterface { rx: 0 })),
        StorageProvider::new(Box::new(FixedDisk)),
        BatteryProvider::new(Box::new(NoBattery)),
    )
}
