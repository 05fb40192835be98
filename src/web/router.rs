//! Web application router and middleware setup.

use crate::metrics::ReportSource;
use crate::web::config::WebConfig;
use crate::web::{handlers, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the axum application for the configured report source.
pub fn create_app(config: &WebConfig) -> Router {
    create_app_with_source(config.source.build())
}

/// Create the axum application around an already built report source.
pub fn create_app_with_source(source: Arc<dyn ReportSource>) -> Router {
    let state = AppState { source };

    Router::new()
        .route("/", get(handlers::serve_index))
        .route("/metrics", get(handlers::serve_metrics))
        .route("/health", get(handlers::health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SourceConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let config = WebConfig::default().with_source(SourceConfig::Fixture {
            path: "does-not-exist.xml".into(),
        });
        let response = create_app(&config)
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_source() {
        let config = WebConfig::default().with_source(SourceConfig::Fixture {
            path: "test.xml".into(),
        });
        let response = create_app(&config)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["source"], "fixture test.xml");
    }
}
