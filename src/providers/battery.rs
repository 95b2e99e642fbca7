use crate::error::SourceError;
use crate::metrics::{clamp_pct, BatteryMetrics};
use crate::providers::FailureLog;
use battery::units::energy::watt_hour;
use battery::units::thermodynamic_temperature::kelvin;

const KELVIN_OFFSET: f64 = 273.15;

/// Charge state as reported by the power-source enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PowerSourceEntry {
    pub current_capacity: f64,
    pub max_capacity: f64,
    pub is_charging: bool,
}

/// Hardware details from the battery registry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatteryRegistry {
    pub max_capacity: f64,
    pub design_capacity: f64,
    pub cycle_count: u32,
    /// Tenths of a Kelvin.
    pub temperature_dk: Option<f64>,
}

/// Read once per sample: `power_sources` first, then `registry` for the
/// battery that enumeration found.
pub trait BatterySource: Send {
    fn power_sources(&mut self) -> Result<Vec<PowerSourceEntry>, SourceError>;

    /// `Ok(None)` when no registry entry exists for the battery.
    fn registry(&mut self) -> Result<Option<BatteryRegistry>, SourceError>;
}

/// Backed by the `battery` crate; energies are in watt-hours. Each call to
/// `power_sources` enumerates the batteries once and keeps the registry
/// details of the first one for the following `registry` call.
#[derive(Debug, Default)]
pub struct SystemBatterySource {
    pending_registry: Option<BatteryRegistry>,
}

impl SystemBatterySource {
    fn registry_of(b: &battery::Battery) -> BatteryRegistry {
        BatteryRegistry {
            max_capacity: f64::from(b.energy_full().get::<watt_hour>()),
            design_capacity: f64::from(b.energy_full_design().get::<watt_hour>()),
            cycle_count: b.cycle_count().unwrap_or(0),
            temperature_dk: b
                .temperature()
                .map(|t| f64::from(t.get::<kelvin>()) * 10.0),
        }
    }
}

impl BatterySource for SystemBatterySource {
    fn power_sources(&mut self) -> Result<Vec<PowerSourceEntry>, SourceError> {
        self.pending_registry = None;
        let manager = battery::Manager::new()?;
        let mut entries = Vec::new();
        for b in manager.batteries()? {
            let b = b?;
            if entries.is_empty() {
                self.pending_registry = Some(Self::registry_of(&b));
            }
            entries.push(PowerSourceEntry {
                current_capacity: f64::from(b.energy().get::<watt_hour>()),
                max_capacity: f64::from(b.energy_full().get::<watt_hour>()),
                is_charging: b.state() == battery::State::Charging,
            });
        }
        Ok(entries)
    }

    fn registry(&mut self) -> Result<Option<BatteryRegistry>, SourceError> {
        Ok(self.pending_registry.take())
    }
}

pub struct BatteryProvider {
    source: Box<dyn BatterySource>,
    failures: FailureLog,
}

impl BatteryProvider {
    pub fn new(source: Box<dyn BatterySource>) -> Self {
        Self {
            source,
            failures: FailureLog::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemBatterySource::default()))
    }

    pub fn sample(&mut self) -> BatteryMetrics {
        let entry = match self.source.power_sources() {
            Ok(entries) => {
                self.failures.succeeded("battery");
                match entries.into_iter().next() {
                    Some(entry) => entry,
                    None => return BatteryMetrics::default(),
                }
            }
            Err(e) => {
                self.failures.failed("battery", &e);
                return BatteryMetrics::default();
            }
        };

        let registry = match self.source.registry() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::debug!("battery registry lookup failed: {}", e);
                None
            }
        };
        Self::merge(&entry, registry.as_ref())
    }

    /// Charge level comes from the power source; health, cycles and
    /// temperature from the registry.
    pub fn merge(entry: &PowerSourceEntry, registry: Option<&BatteryRegistry>) -> BatteryMetrics {
        let level_pct = if entry.max_capacity > 0.0 {
            clamp_pct(entry.current_capacity / entry.max_capacity * 100.0)
        } else {
            0.0
        };

        let mut metrics = BatteryMetrics {
            level_pct,
            is_charging: entry.is_charging,
            ..Default::default()
        };

        if let Some(reg) = registry {
            if reg.max_capacity > 0.0 && reg.design_capacity > 0.0 {
                metrics.health_pct = (reg.max_capacity / reg.design_capacity * 100.0).max(0.0);
            }
            metrics.cycle_count = reg.cycle_count;
            metrics.temperature_c = reg
                .temperature_dk
                .filter(|dk| dk.is_finite() && *dk > 0.0)
                .map(decikelvin_to_celsius)
                .unwrap_or(0.0);
        }
        metrics
    }
}

pub fn decikelvin_to_celsius(raw: f64) -> f64 {
    raw / 10.0 - KELVIN_OFFSET
}
