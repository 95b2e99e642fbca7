use crate::error::SourceError;
use crate::metrics::{clamp_pct, CpuMetrics};
use crate::providers::FailureLog;
use std::path::PathBuf;
use tracing::trace;

/// Cumulative CPU tick counters since boot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CpuTicks {
    fn total(&self) -> u64 {
        self.user
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.nice)
    }

    fn regressed_from(&self, prev: &CpuTicks) -> bool {
        self.user < prev.user
            || self.system < prev.system
            || self.idle < prev.idle
            || self.nice < prev.nice
    }
}

pub trait CpuSource: Send {
    fn read_ticks(&mut self) -> Result<CpuTicks, SourceError>;
}

/// Reads the aggregate `cpu` line of `/proc/stat`.
pub struct ProcStatSource {
    path: PathBuf,
}

impl ProcStatSource {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcStatSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource for ProcStatSource {
    fn read_ticks(&mut self) -> Result<CpuTicks, SourceError> {
        let text =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        parse_proc_stat(&text)
    }
}

/// irq and softirq are folded into system time, iowait into idle.
pub fn parse_proc_stat(text: &str) -> Result<CpuTicks, SourceError> {
    let line = text
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SourceError::parse("/proc/stat", "no aggregate cpu line"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::parse("/proc/stat", e.to_string()))?;
    if fields.len() < 4 {
        return Err(SourceError::parse(
            "/proc/stat",
            format!("expected at least 4 counters, got {}", fields.len()),
        ));
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);

    Ok(CpuTicks {
        user: field(0),
        nice: field(1),
        system: field(2) + field(5) + field(6),
        idle: field(3) + field(4),
    })
}

pub struct CpuProvider {
    source: Box<dyn CpuSource>,
    baseline: Option<CpuTicks>,
    failures: FailureLog,
}

impl CpuProvider {
    pub fn new(source: Box<dyn CpuSource>) -> Self {
        Self {
            source,
            baseline: None,
            failures: FailureLog::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(ProcStatSource::new()))
    }

    pub fn sample(&mut self) -> CpuMetrics {
        match self.source.read_ticks() {
            Ok(ticks) => {
                self.failures.succeeded("cpu");
                self.update(ticks)
            }
            Err(e) => {
                // Keep the baseline; the next good read measures the whole gap.
                self.failures.failed("cpu", &e);
                CpuMetrics::idle()
            }
        }
    }

    /// Fold one raw reading into the provider. The reading always becomes
    /// the new baseline, even when no usage can be derived from it.
    pub fn update(&mut self, ticks: CpuTicks) -> CpuMetrics {
        let Some(prev) = self.baseline.replace(ticks) else {
            return CpuMetrics::idle();
        };

        if ticks.regressed_from(&prev) {
            trace!("CPU tick counters went backwards; rebasing");
            return CpuMetrics::idle();
        }
        let delta_total = ticks.total() - prev.total();
        if delta_total == 0 {
            return CpuMetrics::idle();
        }

        let total = delta_total as f64;
        let delta_user = (ticks.user - prev.user) + (ticks.nice - prev.nice);
        let user_pct = clamp_pct(delta_user as f64 / total * 100.0);
        let system_pct = clamp_pct((ticks.system - prev.system) as f64 / total * 100.0);
        let idle_pct = clamp_pct((ticks.idle - prev.idle) as f64 / total * 100.0);

        CpuMetrics {
            // Capped to absorb float rounding in the sum.
            usage_pct: (user_pct + system_pct).min(100.0),
            system_pct,
            user_pct,
            idle_pct,
        }
    }
}
