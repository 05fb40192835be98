//! HTTP surface of the exporter.
//!
//! Every request to `/metrics` runs the whole fetch, parse and emit pipeline on
//! its own; the only thing requests share is the immutable report source.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::{create_app, create_app_with_source};

use crate::error::{ExporterError, Result};
use crate::metrics::ReportSource;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ReportSource>,
}

/// Start the web server with the provided configuration.
pub async fn start_web_server(config: WebConfig) -> Result<()> {
    let app = create_app(&config);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| ExporterError::config_error(format!("Invalid bind address: {}", e)))?;

    if config.source.is_test_mode() {
        info!("Test mode is enabled");
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Nvidia SMI exporter listening on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
