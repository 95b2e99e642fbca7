//! Persisted monitor settings.
//!
//! The storage itself is an external key-value store; [`MonitorSettings`]
//! layers defaults and clamping on top of whatever [`KeyValueStore`] it is
//! given.

use crate::error::SettingsError;
use crate::metrics::MetricsSample;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;
use std::time::Duration;

pub const INTERVAL_KEY: &str = "MonitorUpdateInterval";
pub const METRIC_KEY: &str = "DisplayMetricType";

pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
pub const MIN_INTERVAL_SECS: f64 = 0.5;
pub const MAX_INTERVAL_SECS: f64 = 10.0;

/// Which metric the display layer surfaces in its compact view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayedMetric {
    #[default]
    Cpu,
    Memory,
    Network,
}

impl DisplayedMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Network => "network",
        }
    }

    /// CPU usage, memory usage, or combined up+down Mbps.
    pub fn value(&self, sample: &MetricsSample) -> f64 {
        match self {
            Self::Cpu => sample.cpu.usage_pct,
            Self::Memory => sample.memory.usage_pct,
            Self::Network => sample.network.upload_mbps + sample.network.download_mbps,
        }
    }

    /// Compact label text; `--` before the first sample.
    pub fn headline(&self, sample: Option<&MetricsSample>) -> String {
        let Some(sample) = sample else {
            return "--".to_string();
        };
        let value = self.value(sample);
        match self {
            Self::Cpu | Self::Memory => format!("{value:.0}%"),
            Self::Network => format!("{value:.1}"),
        }
    }
}

impl fmt::Display for DisplayedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayedMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "network" => Ok(Self::Network),
            other => Err(format!("unknown metric `{other}`")),
        }
    }
}

/// NaN falls back to the default; everything else is clamped into range.
pub fn clamp_interval(secs: f64) -> f64 {
    if secs.is_nan() {
        DEFAULT_INTERVAL_SECS
    } else {
        secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
    }
}

/// Contract of the external settings store.
pub trait KeyValueStore: Send + Sync {
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn set_f64(&self, key: &str, value: f64) -> Result<(), SettingsError>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let guard = match self.values.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut guard = match self.values.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(key.to_string(), value);
    }
}

impl KeyValueStore for MemoryStore {
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<(), SettingsError> {
        self.set(key, Value::from(value));
        Ok(())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.set(key, Value::from(value));
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileStore {
    /// A missing file starts empty and is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Option<Value> {
        let guard = match self.values.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut guard = match self.values.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Only values that reached the file become visible to readers.
        let mut updated = guard.clone();
        updated.insert(key.to_string(), value);
        let text = serde_json::to_string_pretty(&updated)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        *guard = updated;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<(), SettingsError> {
        self.set(key, Value::from(value))
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.set(key, Value::from(value))
    }
}

/// Interval and displayed metric, read through a [`KeyValueStore`].
pub struct MonitorSettings {
    store: Box<dyn KeyValueStore>,
}

impl MonitorSettings {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn update_interval(&self) -> f64 {
        self.store
            .get_f64(INTERVAL_KEY)
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(clamp_interval)
            .unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn update_interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.update_interval())
    }

    /// Returns the clamped value that was stored.
    pub fn set_update_interval(&self, secs: f64) -> Result<f64, SettingsError> {
        let clamped = clamp_interval(secs);
        self.store.set_f64(INTERVAL_KEY, clamped)?;
        Ok(clamped)
    }

    pub fn displayed_metric(&self) -> DisplayedMetric {
        self.store
            .get_string(METRIC_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_displayed_metric(&self, metric: DisplayedMetric) -> Result<(), SettingsError> {
        self.store.set_string(METRIC_KEY, metric.as_str())
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::in_memory()
    }
}
