mod common;

use axum::body::Body;
use axum::http::{header, Method, Request};
use host_monitor::api::{router, AppState};
use host_monitor::monitor::{Monitor, MonitorHandle};
use host_monitor::settings::{DisplayedMetric, MonitorSettings};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

fn idle_monitor() -> Monitor {
    Monitor::new(common::fake_sampler(), MonitorSettings::in_memory(), 10)
}

/// Starts the scheduler and waits for its immediate first sample.
async fn sampled_monitor() -> (Monitor, MonitorHandle) {
    let mut monitor = idle_monitor();
    let handle = monitor.handle();
    let mut rx = handle.subscribe();
    monitor.start().unwrap();
    rx.recv().await.unwrap();
    (monitor, handle)
}

fn app(monitor: MonitorHandle) -> axum::Router {
    router(AppState {
        monitor,
        shutdown: CancellationToken::new(),
    })
}

async fn get_json(app: axum::Router, uri: &str) -> (u16, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn history_initially_empty() {
    let monitor = idle_monitor();
    let (status, json) = get_json(app(monitor.handle()), "/api/history").await;
    assert_eq!(status, 200);
    assert!(json.is_array());
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn health_ok() {
    let monitor = idle_monitor();
    let (status, json) = get_json(app(monitor.handle()), "/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn latest_is_404_before_first_sample() {
    let monitor = idle_monitor();
    let (status, json) = get_json(app(monitor.handle()), "/api/metrics").await;
    assert_eq!(status, 404);
    assert_eq!(json["error"], "no data yet");
}

#[tokio::test]
async fn latest_returns_sample_fields() {
    let (mut monitor, handle) = sampled_monitor().await;
    let (status, json) = get_json(app(handle), "/api/metrics").await;
    assert_eq!(status, 200);
    assert_eq!(json["cpu"]["idle_pct"].as_f64().unwrap(), 100.0);
    assert_eq!(json["network"]["local_ip"], "10.0.0.7");
    assert_eq!(json["battery"]["is_charging"], false);
    assert_eq!(json["storage"]["total_gb"].as_f64().unwrap(), 500.0);
    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn history_filters_by_since_ms() {
    let (mut monitor, handle) = sampled_monitor().await;
    monitor.stop().await.unwrap();
    let ts = handle.latest().unwrap().timestamp_ms as u64;

    let (_, all) = get_json(app(handle.clone()), &format!("/api/history?since_ms={ts}")).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["timestamp_ms"].as_u64().unwrap(), ts);

    let later = ts + 1;
    let (_, none) = get_json(app(handle), &format!("/api/history?since_ms={later}")).await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn settings_round_trip_through_put() {
    let monitor = idle_monitor();
    let handle = monitor.handle();

    let response = app(handle.clone())
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/settings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"update_interval_secs": 0.1, "displayed_metric": "memory"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["update_interval_secs"].as_f64().unwrap(), 0.5);
    assert_eq!(json["displayed_metric"], "memory");

    assert_eq!(handle.displayed_metric(), DisplayedMetric::Memory);
    let (_, json) = get_json(app(handle), "/api/settings").await;
    assert_eq!(json["update_interval_secs"].as_f64().unwrap(), 0.5);
}

#[tokio::test]
async fn headline_uses_displayed_metric() {
    let (mut monitor, handle) = sampled_monitor().await;
    monitor.stop().await.unwrap();

    let (_, json) = get_json(app(handle.clone()), "/api/headline").await;
    assert_eq!(json["metric"], "cpu");
    assert_eq!(json["text"], "0%");

    handle.set_displayed_metric(DisplayedMetric::Network);
    let (_, json) = get_json(app(handle), "/api/headline").await;
    assert_eq!(json["metric"], "network");
    assert_eq!(json["text"], "0.0");
}

#[tokio::test]
async fn headline_placeholder_without_samples() {
    let monitor = idle_monitor();
    let (_, json) = get_json(app(monitor.handle()), "/api/headline").await;
    assert_eq!(json["text"], "--");
    assert!(json["value"].is_null());
}

#[tokio::test]
async fn stream_is_event_stream() {
    let monitor = idle_monitor();
    let response = app(monitor.handle())
        .oneshot(
            Request::builder()
                .uri("/api/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let ct = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(ct.starts_with("text/event-stream"));
}
