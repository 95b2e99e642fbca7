use clap::Parser;
use host_monitor::api::{router, AppState};
use host_monitor::config::Config;
use host_monitor::console;
use host_monitor::monitor::Monitor;
use host_monitor::runtime;
use host_monitor::sampler::Sampler;
use host_monitor::settings::{JsonFileStore, MonitorSettings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn load_settings(cfg: &Config) -> MonitorSettings {
    let Some(path) = &cfg.settings else {
        return MonitorSettings::in_memory();
    };
    match JsonFileStore::open(path) {
        Ok(store) => {
            info!("Using settings file {}", store.path().display());
            MonitorSettings::new(Box::new(store))
        }
        Err(e) => {
            warn!(
                "Cannot open settings file {}: {}; using in-memory settings",
                path.display(),
                e
            );
            MonitorSettings::in_memory()
        }
    }
}

#[tokio::main]
async fn main() {
    runtime::init_tracing();
    let cfg = Config::parse();

    let settings = load_settings(&cfg);
    if let Some(secs) = cfg.interval_secs {
        if let Err(e) = settings.set_update_interval(secs) {
            warn!("Failed to persist interval override: {}", e);
        }
    }
    if let Some(metric) = cfg.metric {
        if let Err(e) = settings.set_displayed_metric(metric) {
            warn!("Failed to persist metric override: {}", e);
        }
    }
    info!(
        "Starting: interval={}s, metric={}, history={}, mode={:?}",
        settings.update_interval(),
        settings.displayed_metric(),
        cfg.history,
        cfg.mode
    );

    let mut monitor = Monitor::new(Sampler::system(), settings, cfg.history);
    if let Err(e) = monitor.start() {
        error!("Failed to start scheduler: {}", e);
        return;
    }
    let cancel = CancellationToken::new();

    let console_handle = if cfg.console_enabled() {
        let handle = monitor.handle();
        let console_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            console::run_console(handle, console_cancel).await;
        }))
    } else {
        None
    };

    let web_handle = if cfg.web_enabled() {
        let app = router(AppState {
            monitor: monitor.handle(),
            shutdown: cancel.clone(),
        });
        let addr = cfg.http_addr();
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(
                    "HTTP server listening on http://{}",
                    listener.local_addr().unwrap_or(addr)
                );
                let shutdown = cancel.clone();
                Some(tokio::spawn(async move {
                    let res = axum::serve(listener, app)
                        .with_graceful_shutdown(async move { shutdown.cancelled().await })
                        .await;
                    if let Err(e) = res {
                        error!("Server error: {}", e);
                    }
                }))
            }
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                None
            }
        }
    } else {
        None
    };

    runtime::shutdown_signal().await;
    cancel.cancel();

    if let Some(h) = web_handle {
        let _ = h.await;
    }
    if let Some(h) = console_handle {
        let _ = h.await;
    }
    if let Err(e) = monitor.stop().await {
        error!("Scheduler shutdown failed: {}", e);
    }
}
