use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reported when no IPv4 address could be resolved for a qualifying interface.
pub const UNKNOWN_IP: &str = "unknown";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// `user_pct + system_pct`.
    pub usage_pct: f64,
    pub system_pct: f64,
    /// Includes niced user time.
    pub user_pct: f64,
    pub idle_pct: f64,
}

impl CpuMetrics {
    /// Reported when no delta is available yet.
    pub fn idle() -> Self {
        Self {
            usage_pct: 0.0,
            system_pct: 0.0,
            user_pct: 0.0,
            idle_pct: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub usage_pct: f64,
    pub used_mb: f64,
    pub free_mb: f64,
    /// Mirrors `usage_pct`; no independent pressure signal is read.
    pub pressure_pct: f64,
    /// Anonymous (non file-backed) memory, in GiB.
    pub app_gb: f64,
    pub wired_gb: f64,
    pub compressed_gb: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub upload_mbps: f64,
    pub download_mbps: f64,
    pub local_ip: String,
}

impl Default for NetworkMetrics {
    fn default() -> Self {
        Self {
            upload_mbps: 0.0,
            download_mbps: 0.0,
            local_ip: UNKNOWN_IP.to_string(),
        }
    }
}

/// Root volume capacity in decimal gigabytes (1e9 bytes).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub used_gb: f64,
    pub total_gb: f64,
    pub usage_pct: f64,
}

/// All fields zero/false means "no battery".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryMetrics {
    pub level_pct: f64,
    pub is_charging: bool,
    pub health_pct: f64,
    pub cycle_count: u32,
    /// 0 when the sensor is unavailable.
    pub temperature_c: f64,
}

impl BatteryMetrics {
    pub fn is_absent(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub timestamp_ms: u128,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub network: NetworkMetrics,
    pub storage: StorageMetrics,
    pub battery: BatteryMetrics,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn now_timestamp_ms() -> u128 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(dur) => dur.as_millis(),
        Err(err) => {
            // System clock is before UNIX_EPOCH; return 0 and let caller decide what to do.
            tracing::error!("SystemTime before UNIX_EPOCH: {}", err);
            0
        }
    }
}

/// Clamp a percentage into [0, 100]; NaN collapses to 0.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pct_bounds() {
        assert_eq!(clamp_pct(-3.0), 0.0);
        assert_eq!(clamp_pct(250.0), 100.0);
        assert_eq!(clamp_pct(42.5), 42.5);
        assert_eq!(clamp_pct(f64::NAN), 0.0);
    }

    #[test]
    fn default_battery_is_absent() {
        assert!(BatteryMetrics::default().is_absent());
        let present = BatteryMetrics {
            level_pct: 80.0,
            ..Default::default()
        };
        assert!(!present.is_absent());
    }
}
