//! # nvidia-smi exporter
//!
//! Republishes `nvidia-smi` GPU telemetry in the Prometheus text exposition
//! format. Every scrape of `/metrics` runs the tool, parses its XML report and
//! writes one line per reading; nothing is cached between scrapes.
//!
//! ## Pipeline
//!
//! - **Source**: [`NvidiaSmiSource`] runs `nvidia-smi -q -x`, [`FixtureSource`]
//!   reads a captured report (test mode)
//! - **Parser**: [`parse`] turns the XML into an [`NvidiaSmiLog`], never failing
//! - **Emitter**: [`render`] writes `nvidiasmi_*` lines, skipping readings that
//!   carry no number
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nvidia_smi_exporter::{start_web_server, SourceConfig, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WebConfig::default().with_source(SourceConfig::Fixture {
//!         path: "test.xml".into(),
//!     });
//!     start_web_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod web;

// Re-export public API
pub use error::{ExporterError, Result};
pub use metrics::{
    data::{GpuDevice, NvidiaSmiLog},
    emit, normalize, parse, render, scrape,
    source::{FixtureSource, NvidiaSmiSource, SourceConfig},
    traits::ReportSource,
};

pub use web::{create_app, create_app_with_source, start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 9202;

/// Default location of the nvidia-smi executable
pub const DEFAULT_NVIDIA_SMI_PATH: &str = "/usr/bin/nvidia-smi";

/// Fixture read in test mode, relative to the working directory
pub const DEFAULT_FIXTURE_FILE: &str = "test.xml";
