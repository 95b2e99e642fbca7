use crate::error::SourceError;
use crate::metrics::{NetworkMetrics, UNKNOWN_IP};
use crate::providers::FailureLog;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::Networks;
use tracing::{debug, warn};

const BYTES_PER_MEBIBYTE: f64 = 1_048_576.0;

const IFF_UP: u32 = 0x1;
const IFF_LOOPBACK: u32 = 0x8;
const IFF_RUNNING: u32 = 0x40;

/// One interface as seen by a single enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceReading {
    pub name: String,
    pub is_up: bool,
    pub is_running: bool,
    pub is_loopback: bool,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub ipv4: Vec<Ipv4Addr>,
}

impl InterfaceReading {
    fn qualifies(&self) -> bool {
        self.is_up && self.is_running && !self.is_loopback
    }
}

pub trait NetworkSource: Send {
    fn read_interfaces(&mut self) -> Result<Vec<InterfaceReading>, SourceError>;
}

/// Byte counters from `sysinfo`, interface flags from `/sys/class/net`.
pub struct SysinfoNetworkSource {
    networks: Networks,
    sys_class_net: PathBuf,
}

impl SysinfoNetworkSource {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            sys_class_net: PathBuf::from("/sys/class/net"),
        }
    }

    fn flags(&self, name: &str) -> Option<u32> {
        let raw = std::fs::read_to_string(self.sys_class_net.join(name).join("flags")).ok()?;
        parse_flags(&raw)
    }
}

impl Default for SysinfoNetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSource for SysinfoNetworkSource {
    fn read_interfaces(&mut self) -> Result<Vec<InterfaceReading>, SourceError> {
        self.networks.refresh(true);
        if self.networks.list().is_empty() {
            return Err(SourceError::Unavailable("network interfaces"));
        }

        let readings = self
            .networks
            .list()
            .iter()
            .map(|(name, data)| {
                let (is_up, is_running, is_loopback) = match self.flags(name) {
                    Some(flags) => (
                        flags & IFF_UP != 0,
                        flags & IFF_RUNNING != 0,
                        flags & IFF_LOOPBACK != 0,
                    ),
                    None => (true, true, is_loopback_name(name)),
                };
                InterfaceReading {
                    name: name.clone(),
                    is_up,
                    is_running,
                    is_loopback,
                    rx_bytes: data.total_received(),
                    tx_bytes: data.total_transmitted(),
                    ipv4: data
                        .ip_networks()
                        .iter()
                        .filter_map(|net| match net.addr {
                            IpAddr::V4(v4) => Some(v4),
                            IpAddr::V6(_) => None,
                        })
                        .collect(),
                }
            })
            .collect();
        Ok(readings)
    }
}

/// Parses the hex flag word, e.g. `0x1003`.
pub fn parse_flags(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(digits, 16).ok()
}

fn is_loopback_name(name: &str) -> bool {
    name == "lo" || name == "lo0"
}

/// First IPv4 address of a qualifying interface, preferring wired/wireless
/// names over tunnels and bridges.
pub fn resolve_local_ip(interfaces: &[InterfaceReading]) -> String {
    let preferred = |name: &str| ["en", "eth", "wl"].iter().any(|p| name.starts_with(p));
    let mut candidates: Vec<&InterfaceReading> = interfaces
        .iter()
        .filter(|i| i.qualifies() && !i.ipv4.is_empty())
        .collect();
    candidates.sort_by(|a, b| {
        preferred(&b.name)
            .cmp(&preferred(&a.name))
            .then_with(|| a.name.cmp(&b.name))
    });

    candidates
        .iter()
        .flat_map(|i| i.ipv4.iter())
        .find(|ip| !ip.is_loopback() && !ip.is_unspecified())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Lifetime byte counters of each qualifying interface, keyed by name.
type Counters = HashMap<String, (u64, u64)>;

fn qualifying_counters(interfaces: &[InterfaceReading]) -> Counters {
    let mut counters = Counters::new();
    for i in interfaces.iter().filter(|i| i.qualifies()) {
        let entry = counters.entry(i.name.clone()).or_insert((0, 0));
        entry.0 = entry.0.saturating_add(i.rx_bytes);
        entry.1 = entry.1.saturating_add(i.tx_bytes);
    }
    counters
}

pub struct NetworkProvider {
    source: Box<dyn NetworkSource>,
    baseline: Option<(Counters, Instant)>,
    failures: FailureLog,
}

impl NetworkProvider {
    pub fn new(source: Box<dyn NetworkSource>) -> Self {
        Self {
            source,
            baseline: None,
            failures: FailureLog::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SysinfoNetworkSource::new()))
    }

    pub fn sample(&mut self, now: Instant) -> NetworkMetrics {
        match self.source.read_interfaces() {
            Ok(interfaces) => {
                self.failures.succeeded("network");
                self.update(&interfaces, now)
            }
            Err(e) => {
                self.failures.failed("network", &e);
                NetworkMetrics::default()
            }
        }
    }

    /// Fold one enumeration taken at `now` into the provider. The current
    /// counters always become the new baseline.
    ///
    /// Only interfaces present in both readings contribute. One that joins
    /// seeds its own baseline and one whose counters went backwards is
    /// treated as reset, so neither produces a spike.
    pub fn update(&mut self, interfaces: &[InterfaceReading], now: Instant) -> NetworkMetrics {
        let current = qualifying_counters(interfaces);
        let local_ip = resolve_local_ip(interfaces);

        let Some((prev, prev_at)) = self.baseline.replace((current, now)) else {
            return NetworkMetrics {
                local_ip,
                ..Default::default()
            };
        };

        let dt = match now.checked_duration_since(prev_at) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => {
                debug!("Non-positive elapsed time between network reads");
                return NetworkMetrics {
                    local_ip,
                    ..Default::default()
                };
            }
        };

        let mut inbound = 0u64;
        let mut outbound = 0u64;
        if let Some((current, _)) = &self.baseline {
            for (name, &(rx, tx)) in current {
                let Some(&(prev_rx, prev_tx)) = prev.get(name) else {
                    debug!("Interface {} joined; seeding its baseline", name);
                    continue;
                };
                if rx < prev_rx || tx < prev_tx {
                    warn!("Byte counters of {} decreased; possible interface reset, rebasing", name);
                    continue;
                }
                inbound = inbound.saturating_add(rx - prev_rx);
                outbound = outbound.saturating_add(tx - prev_tx);
            }
        }

        NetworkMetrics {
            upload_mbps: to_mbps(outbound, dt),
            download_mbps: to_mbps(inbound, dt),
            local_ip,
        }
    }
}

fn to_mbps(delta_bytes: u64, dt_secs: f64) -> f64 {
    (delta_bytes as f64 / dt_secs) / BYTES_PER_MEBIBYTE * 8.0
}
