use crate::error::SourceError;
use crate::metrics::{clamp_pct, StorageMetrics};
use crate::providers::FailureLog;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

const BYTES_PER_GB: f64 = 1e9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VolumeCapacity {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

pub trait StorageSource: Send {
    fn read_root_volume(&mut self) -> Result<VolumeCapacity, SourceError>;
}

pub struct SysinfoDiskSource {
    disks: Disks,
    mount_point: PathBuf,
}

impl SysinfoDiskSource {
    pub fn new() -> Self {
        Self::for_mount_point("/")
    }

    pub fn for_mount_point(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            mount_point: mount_point.into(),
        }
    }
}

impl Default for SysinfoDiskSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageSource for SysinfoDiskSource {
    fn read_root_volume(&mut self) -> Result<VolumeCapacity, SourceError> {
        self.disks.refresh(true);
        let mount_point: &Path = &self.mount_point;
        self.disks
            .list()
            .iter()
            .find(|d| d.mount_point() == mount_point)
            .map(|d| VolumeCapacity {
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .ok_or(SourceError::Unavailable("root volume"))
    }
}

pub struct StorageProvider {
    source: Box<dyn StorageSource>,
    failures: FailureLog,
}

impl StorageProvider {
    pub fn new(source: Box<dyn StorageSource>) -> Self {
        Self {
            source,
            failures: FailureLog::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SysinfoDiskSource::new()))
    }

    pub fn sample(&mut self) -> StorageMetrics {
        match self.source.read_root_volume() {
            Ok(capacity) => {
                self.failures.succeeded("storage");
                Self::compute(capacity)
            }
            Err(e) => {
                self.failures.failed("storage", &e);
                StorageMetrics::default()
            }
        }
    }

    /// Decimal gigabytes, matching how volume sizes are usually displayed.
    pub fn compute(capacity: VolumeCapacity) -> StorageMetrics {
        let used = capacity
            .total_bytes
            .saturating_sub(capacity.available_bytes);
        let total_gb = capacity.total_bytes as f64 / BYTES_PER_GB;
        let used_gb = used as f64 / BYTES_PER_GB;
        let usage_pct = if capacity.total_bytes > 0 {
            clamp_pct(used as f64 / capacity.total_bytes as f64 * 100.0)
        } else {
            0.0
        };
        StorageMetrics {
            used_gb,
            total_gb,
            usage_pct,
        }
    }
}
