//! HTTP handlers for the exporter endpoints.

use crate::metrics;
use crate::web::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, info};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Run one scrape and return the exposition body.
///
/// A source failure is logged and answered with `502 Bad Gateway` and an empty
/// body; the server keeps serving later scrapes.
pub async fn serve_metrics(State(state): State<AppState>) -> Response {
    info!("Serving /metrics");

    match metrics::scrape(state.source.as_ref()).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to fetch report from {}: {}", state.source.describe(), e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "nvidia-smi-exporter",
        "version": env!("CARGO_PKG_VERSION"),
        "source": state.source.describe(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve the static index page.
pub async fn serve_index() -> Html<&'static str> {
    info!("Serving /index");
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
    <head>
        <meta charset="utf-8">
        <title>Nvidia SMI Exporter</title>
    </head>
    <body>
        <h1>Nvidia SMI Exporter</h1>
        <p><a href="/metrics">Metrics</a></p>
    </body>
</html>"#;
