use crate::error::SourceError;
use crate::metrics::{clamp_pct, MemoryMetrics};
use crate::providers::FailureLog;
use std::collections::HashMap;
use std::path::PathBuf;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Page counts from one VM statistics read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VmStats {
    pub page_size: u64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub wired: u64,
    pub compressed: u64,
    /// Anonymous pages, not backed by a file.
    pub internal: u64,
}

impl VmStats {
    fn bytes(&self, pages: u64) -> f64 {
        pages as f64 * self.page_size as f64
    }
}

pub trait MemorySource: Send {
    fn read_vm_stats(&mut self) -> Result<VmStats, SourceError>;
}

/// Reads `/proc/meminfo`. Its values are KiB, so they are reported as
/// counts of 1024-byte pages.
pub struct MeminfoSource {
    path: PathBuf,
}

impl MeminfoSource {
    pub fn new() -> Self {
        Self::with_path("/proc/meminfo")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for MeminfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for MeminfoSource {
    fn read_vm_stats(&mut self) -> Result<VmStats, SourceError> {
        let text =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        parse_meminfo(&text)
    }
}

pub fn parse_meminfo(text: &str) -> Result<VmStats, SourceError> {
    let fields: HashMap<&str, u64> = text
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), value))
        })
        .collect();

    let required = |key: &'static str| {
        fields
            .get(key)
            .copied()
            .ok_or_else(|| SourceError::parse("/proc/meminfo", format!("missing {key}")))
    };
    let optional = |key: &str| fields.get(key).copied().unwrap_or(0);

    Ok(VmStats {
        page_size: 1024,
        free: required("MemFree")?,
        active: required("Active")?,
        inactive: required("Inactive")?,
        wired: optional("Unevictable")
            + optional("KernelStack")
            + optional("PageTables")
            + optional("SUnreclaim"),
        compressed: optional("Zswap"),
        internal: optional("AnonPages"),
    })
}

pub struct MemoryProvider {
    source: Box<dyn MemorySource>,
    failures: FailureLog,
}

impl MemoryProvider {
    pub fn new(source: Box<dyn MemorySource>) -> Self {
        Self {
            source,
            failures: FailureLog::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(MeminfoSource::new()))
    }

    pub fn sample(&mut self) -> MemoryMetrics {
        match self.source.read_vm_stats() {
            Ok(stats) => {
                self.failures.succeeded("memory");
                Self::compute(&stats)
            }
            Err(e) => {
                self.failures.failed("memory", &e);
                MemoryMetrics::default()
            }
        }
    }

    pub fn compute(stats: &VmStats) -> MemoryMetrics {
        let free = stats.bytes(stats.free);
        let inactive = stats.bytes(stats.inactive);
        let wired = stats.bytes(stats.wired);
        let compressed = stats.bytes(stats.compressed);
        let used = stats.bytes(stats.active) + wired + compressed;
        let total = used + free + inactive;

        let usage_pct = if total > 0.0 {
            clamp_pct(used / total * 100.0)
        } else {
            0.0
        };

        MemoryMetrics {
            usage_pct,
            used_mb: used / MIB,
            free_mb: free / MIB,
            pressure_pct: usage_pct,
            app_gb: stats.bytes(stats.internal) / GIB,
            wired_gb: wired / GIB,
            compressed_gb: compressed / GIB,
        }
    }
}
