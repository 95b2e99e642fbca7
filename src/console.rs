use crate::metrics::MetricsSample;
use crate::monitor::MonitorHandle;
use crate::settings::DisplayedMetric;
use chrono::{Local, TimeZone};
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::ExecutableCommand;
use std::io::{stdout, Write};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Redraws the terminal each time a sample is appended.
pub async fn run_console(monitor: MonitorHandle, cancel: CancellationToken) {
    let mut rx = monitor.subscribe();
    if let Err(e) = render_once(&monitor) {
        error!("Console render error: {}", e);
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            msg = rx.recv() => {
                match msg {
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        debug!("Console skipped {} samples", n);
                    }
                    Err(RecvError::Closed) => break,
                }
                if let Err(e) = render_once(&monitor) {
                    error!("Console render error: {}", e);
                }
            }
        }
    }
}

fn render_once(monitor: &MonitorHandle) -> std::io::Result<()> {
    let mut out = stdout();
    out.execute(MoveTo(0, 0))?;
    out.execute(Clear(ClearType::All))?;

    let metric = monitor.displayed_metric();
    let latest = monitor.latest();

    writeln!(
        out,
        "Host Monitor  [{} {}]  every {:.1}s",
        metric,
        metric.headline(latest.as_ref()),
        monitor.update_interval()
    )?;
    writeln!(out, "Press Ctrl+C to exit.")?;
    writeln!(out)?;

    let Some(snap) = latest else {
        writeln!(out, "Waiting for first sample...")?;
        out.flush()?;
        return Ok(());
    };

    for line in render_lines(&snap, metric) {
        writeln!(out, "{line}")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{}/{} samples retained",
        monitor.history_len(),
        monitor.history_capacity()
    )?;

    out.flush()?;
    Ok(())
}

fn render_lines(snap: &MetricsSample, metric: DisplayedMetric) -> Vec<String> {
    let marker = |m: DisplayedMetric| if m == metric { "*" } else { " " };
    let mut lines = vec![format!("Sampled at {}", format_timestamp(snap.timestamp_ms))];

    lines.push(format!(
        "{} CPU      {}  (user {:.1}%, system {:.1}%, idle {:.1}%)",
        marker(DisplayedMetric::Cpu),
        color_pct(snap.cpu.usage_pct, 50.0, 80.0),
        snap.cpu.user_pct,
        snap.cpu.system_pct,
        snap.cpu.idle_pct
    ));
    lines.push(format!(
        "{} Memory   {}  ({:.0} MB used, {:.0} MB free; app {:.2} GB, wired {:.2} GB, compressed {:.2} GB)",
        marker(DisplayedMetric::Memory),
        color_pct(snap.memory.usage_pct, 70.0, 90.0),
        snap.memory.used_mb,
        snap.memory.free_mb,
        snap.memory.app_gb,
        snap.memory.wired_gb,
        snap.memory.compressed_gb
    ));
    lines.push(format!(
        "{} Network  down {:.2} Mbps  up {:.2} Mbps  (IP {})",
        marker(DisplayedMetric::Network),
        snap.network.download_mbps,
        snap.network.upload_mbps,
        snap.network.local_ip
    ));
    lines.push(format!(
        "  Storage  {}  ({:.1} / {:.1} GB)",
        color_pct(snap.storage.usage_pct, 80.0, 95.0),
        snap.storage.used_gb,
        snap.storage.total_gb
    ));

    let battery = &snap.battery;
    if battery.is_absent() {
        lines.push("  Battery  none".to_string());
    } else {
        let temp = if battery.temperature_c == 0.0 {
            "n/a".to_string()
        } else {
            format!("{:.1} C", battery.temperature_c)
        };
        lines.push(format!(
            "  Battery  {:.0}%{}  health {:.0}%, {} cycles, {}",
            battery.level_pct,
            if battery.is_charging { " (charging)" } else { "" },
            battery.health_pct,
            battery.cycle_count,
            temp
        ));
    }
    lines
}

fn format_timestamp(timestamp_ms: u128) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn color_pct(value: f64, warn: f64, crit: f64) -> String {
    let s = format!("{value:5.1}%");
    if value >= crit {
        s.with(Color::Red).to_string()
    } else if value >= warn {
        s.with(Color::Yellow).to_string()
    } else {
        s.with(Color::Green).to_string()
    }
}
