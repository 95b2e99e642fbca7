use crate::history::DEFAULT_CAPACITY;
use crate::settings::DisplayedMetric;
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone, Debug, ValueEnum)]
pub enum Mode {
    Console,
    Web,
    Both,
}

#[derive(Clone, Debug, Parser)]
#[command(
    name = "host_monitor",
    about = "Samples CPU, memory, network, storage and battery counters"
)]
pub struct Config {
    /// Sampling interval in seconds (clamped to 0.5..=10); overrides the stored setting
    #[arg(long)]
    pub interval_secs: Option<f64>,

    /// Metric surfaced in the compact view; overrides the stored setting
    #[arg(long, value_enum)]
    pub metric: Option<DisplayedMetric>,

    /// History depth (number of samples kept in memory)
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub history: usize,

    /// JSON file holding persisted settings (in-memory when omitted)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Output mode (console/web/both)
    #[arg(long, value_enum, default_value_t = Mode::Console)]
    pub mode: Mode,

    /// Bind address for HTTP server
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

impl Config {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from((self.bind, self.port))
    }

    pub fn web_enabled(&self) -> bool {
        matches!(self.mode, Mode::Web | Mode::Both)
    }

    pub fn console_enabled(&self) -> bool {
        matches!(self.mode, Mode::Console | Mode::Both)
    }
}
