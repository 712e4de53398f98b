//! Liveness routes served next to the webhook endpoint.

use crate::misc::format_duration;
use crate::stats::{Snapshot, Stats};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_derive::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SERVICE_NAME: &str = "telegram-bot";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Webhook,
    Polling,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Webhook => f.write_str("webhook"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub stats: Arc<Stats>,
    pub mode: Mode,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    mode: Mode,
    #[serde(flatten)]
    stats: Snapshot,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<HealthState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: SERVICE_NAME,
        mode: state.mode,
        stats: state.stats.snapshot(),
    })
}

async fn index(State(state): State<HealthState>) -> Html<String> {
    let uptime = format_duration(state.stats.uptime().as_secs());

    Html(format!(
        "<h1>🤖 Telegram Video Bot</h1>\n\
         <p>Status: <span style=\"color: green;\">Online</span></p>\n\
         <p>Mode: {}</p>\n\
         <p>Uptime: {uptime}</p>\n",
        state.mode
    ))
}

pub async fn serve(addr: SocketAddr, app: Router, shutdown: impl Future<Output = ()> + Send + 'static) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("HTTP server listening on http://{addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn app(mode: Mode) -> (Router, Arc<Stats>) {
        let stats = Arc::new(Stats::default());
        let state = HealthState {
            stats: stats.clone(),
            mode,
        };
        (router(state), stats)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let (app, stats) = app(Mode::Webhook);
        stats.record_request();
        stats.record_delivery();

        let (status, body) = get_body(app, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert_eq!(json["mode"], "webhook");
        assert_eq!(json["requests"], 1);
        assert_eq!(json["delivered"], 1);
        assert_eq!(json["failed"], 0);
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn index_is_html() {
        let (app, _) = app(Mode::Polling);

        let (status, body) = get_body(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Telegram Video Bot"));
        assert!(body.contains("Mode: polling"));
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let (app, _) = app(Mode::Polling);

        let (status, _) = get_body(app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
