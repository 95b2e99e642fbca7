use crate::metrics::{ErrorResponse, MetricsSample};
use crate::monitor::MonitorHandle;
use crate::settings::DisplayedMetric;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
    pub shutdown: CancellationToken,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub since_ms: Option<u64>,
    pub until_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsView {
    pub update_interval_secs: f64,
    pub displayed_metric: DisplayedMetric,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub update_interval_secs: Option<f64>,
    pub displayed_metric: Option<DisplayedMetric>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeadlineResponse {
    pub metric: DisplayedMetric,
    pub value: Option<f64>,
    pub text: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/metrics", get(get_latest))
        .route("/api/history", get(get_history))
        .route("/api/stream", get(stream))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/headline", get(get_headline))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

async fn get_latest(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.latest() {
        Some(snap) => (StatusCode::OK, Json(snap)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no data yet".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let since_ms = query.since_ms;
    let until_ms = query.until_ms;

    let history: Vec<MetricsSample> = state
        .monitor
        .history()
        .into_iter()
        .filter(|s| since_ms.map(|ts| s.timestamp_ms >= ts as u128).unwrap_or(true))
        .filter(|s| until_ms.map(|ts| s.timestamp_ms <= ts as u128).unwrap_or(true))
        .collect();

    let history = match query.limit {
        Some(limit) => {
            let len = history.len();
            let take = limit.min(len);
            history.into_iter().skip(len - take).collect()
        }
        None => history,
    };

    (StatusCode::OK, Json(history)).into_response()
}

async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.monitor.subscribe();
    let shutdown = state.shutdown.clone();
    let stream = BroadcastStream::new(rx)
        .take_until(async move { shutdown.cancelled().await })
        .map(|msg| match msg {
            Ok(snapshot) => match serde_json::to_string(&snapshot) {
                Ok(json) => Ok(Event::default().data(json)),
                Err(e) => Ok(Event::default()
                    .event("error")
                    .data(format!("serialize_error: {e}"))),
            },
            Err(e) => Ok(Event::default()
                .event("error")
                .data(format!("stream_error: {e}"))),
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keep-alive"),
    )
}

fn settings_view(monitor: &MonitorHandle) -> SettingsView {
    SettingsView {
        update_interval_secs: monitor.update_interval(),
        displayed_metric: monitor.displayed_metric(),
    }
}

async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(settings_view(&state.monitor))).into_response()
}

async fn put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    if let Some(secs) = update.update_interval_secs {
        let applied = state.monitor.set_update_interval(secs);
        info!("Update interval set to {}s via API", applied);
    }
    if let Some(metric) = update.displayed_metric {
        state.monitor.set_displayed_metric(metric);
        info!("Displayed metric set to {} via API", metric);
    }
    (StatusCode::OK, Json(settings_view(&state.monitor))).into_response()
}

async fn get_headline(State(state): State<AppState>) -> impl IntoResponse {
    let metric = state.monitor.displayed_metric();
    let latest = state.monitor.latest();
    let body = HeadlineResponse {
        metric,
        value: latest.as_ref().map(|s| metric.value(s)),
        text: metric.headline(latest.as_ref()),
    };
    (StatusCode::OK, Json(body)).into_response()
}
