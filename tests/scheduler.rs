mod common;

use host_monitor::error::MonitorError;
use host_monitor::monitor::{Monitor, MonitorHandle, SchedulerState};
use host_monitor::settings::MonitorSettings;
use std::time::Duration;
use tokio::time::sleep;

fn monitor_with_interval(secs: f64, capacity: usize) -> (Monitor, MonitorHandle) {
    let settings = MonitorSettings::in_memory();
    settings.set_update_interval(secs).unwrap();
    let monitor = Monitor::new(common::fake_sampler(), settings, capacity);
    let handle = monitor.handle();
    (monitor, handle)
}

#[tokio::test(start_paused = true)]
async fn first_tick_is_immediate_then_follows_interval() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    assert_eq!(monitor.state(), SchedulerState::Idle);
    monitor.start().unwrap();
    assert_eq!(monitor.state(), SchedulerState::Running);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.history_len(), 1);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(handle.history_len(), 2);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(handle.history_len(), 3);

    monitor.stop().await.unwrap();
    assert_eq!(monitor.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn interval_change_reschedules_without_extra_or_missing_ticks() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    monitor.start().unwrap();

    // ticks at t=0 and t=1.0
    sleep(Duration::from_millis(1_200)).await;
    assert_eq!(handle.history_len(), 2);

    assert_eq!(handle.set_update_interval(0.5), 0.5);

    // next tick one new interval after the change: t=1.7
    sleep(Duration::from_millis(450)).await;
    assert_eq!(handle.history_len(), 2);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.history_len(), 3);

    // the old cadence would have fired at t=2.0
    sleep(Duration::from_millis(350)).await;
    assert_eq!(handle.history_len(), 3);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.history_len(), 4);

    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_change_on_a_due_tick_keeps_that_tick() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    monitor.start().unwrap();

    // change lands exactly when the t=1.0 tick is due
    sleep(Duration::from_millis(1_000)).await;
    handle.set_update_interval(0.5);

    sleep(Duration::from_millis(499)).await;
    assert_eq!(handle.history_len(), 2);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(handle.history_len(), 3);

    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_requests_are_clamped() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    monitor.start().unwrap();
    assert_eq!(handle.set_update_interval(0.01), 0.5);
    assert_eq!(handle.update_interval(), 0.5);
    assert_eq!(handle.set_update_interval(60.0), 10.0);
    assert_eq!(handle.update_interval(), 10.0);
    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn history_stays_bounded_and_ordered() {
    let (mut monitor, handle) = monitor_with_interval(0.5, 5);
    monitor.start().unwrap();
    sleep(Duration::from_millis(5_100)).await;
    monitor.stop().await.unwrap();

    let history = handle.history();
    assert_eq!(history.len(), 5);
    assert!(history
        .windows(2)
        .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    for s in &history {
        for pct in [
            s.cpu.usage_pct,
            s.cpu.user_pct,
            s.cpu.system_pct,
            s.cpu.idle_pct,
            s.memory.usage_pct,
            s.memory.pressure_pct,
            s.storage.usage_pct,
            s.battery.level_pct,
        ] {
            assert!((0.0..=100.0).contains(&pct));
        }
        assert!(s.storage.used_gb <= s.storage.total_gb);
        assert!(s.battery.is_absent());
    }
}

#[tokio::test(start_paused = true)]
async fn differential_providers_start_from_baseline_defaults() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    monitor.start().unwrap();
    sleep(Duration::from_millis(1_010)).await;
    monitor.stop().await.unwrap();

    let history = handle.history();
    let first = &history[0];
    assert_eq!(first.cpu.usage_pct, 0.0);
    assert_eq!(first.cpu.idle_pct, 100.0);
    assert_eq!(first.network.download_mbps, 0.0);
    assert_eq!(first.network.upload_mbps, 0.0);
    assert_eq!(first.network.local_ip, "10.0.0.7");

    let second = &history[1];
    assert!((second.cpu.user_pct - 30.0).abs() < 1e-9);
    assert!((second.cpu.idle_pct - 70.0).abs() < 1e-9);
    assert!((second.memory.usage_pct - 50.0).abs() < 1e-9);
    assert!((second.storage.usage_pct - 75.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn stop_and_restart_keeps_baselines() {
    let (mut monitor, handle) = monitor_with_interval(2.0, 120);
    monitor.start().unwrap();
    sleep(Duration::from_millis(10)).await;
    monitor.stop().await.unwrap();
    assert_eq!(handle.history_len(), 1);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.history_len(), 1);

    monitor.start().unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.history_len(), 2);
    // The restart resumed from the stored CPU reading rather than a fresh baseline.
    let latest = handle.latest().unwrap();
    assert!((latest.cpu.user_pct - 30.0).abs() < 1e-9);

    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn lifecycle_errors() {
    let (mut monitor, _handle) = monitor_with_interval(1.0, 120);
    assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning)));
    monitor.start().unwrap();
    assert!(matches!(monitor.start(), Err(MonitorError::AlreadyRunning)));
    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn crashed_scheduler_reports_lost_sampler_on_restart() {
    let settings = MonitorSettings::in_memory();
    let mut monitor = Monitor::new(common::crashing_sampler(), settings, 120);
    monitor.start().unwrap();
    sleep(Duration::from_millis(1_500)).await;

    assert!(matches!(monitor.stop().await, Err(MonitorError::Join(_))));
    assert_eq!(monitor.state(), SchedulerState::Idle);
    assert!(matches!(monitor.start(), Err(MonitorError::SamplerLost)));
    assert!(matches!(monitor.stop().await, Err(MonitorError::NotRunning)));
}

#[tokio::test(start_paused = true)]
async fn notification_follows_append() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    let mut rx = handle.subscribe();
    monitor.start().unwrap();

    let notified = rx.recv().await.unwrap();
    assert!(handle.history().contains(&notified));
    assert_eq!(handle.latest().unwrap(), notified);

    monitor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_rereads_interval_from_settings() {
    let (mut monitor, handle) = monitor_with_interval(1.0, 120);
    monitor.start().unwrap();
    sleep(Duration::from_millis(10)).await;
    monitor.stop().await.unwrap();

    handle.set_update_interval(3.0);
    monitor.start().unwrap();
    // immediate tick on restart, then one every 3s
    sleep(Duration::from_millis(2_900)).await;
    assert_eq!(handle.history_len(), 2);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.history_len(), 3);
    monitor.stop().await.unwrap();
}
