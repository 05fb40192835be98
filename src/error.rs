//! Error handling for the nvidia-smi exporter.

use std::process::ExitStatus;

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for the exporter.
///
/// Only acquiring the report can fail. Field-level problems inside a report are
/// absorbed by the parser and emitter and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// I/O operation failed (fixture unreadable, executable missing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external tool ran but did not succeed
    #[error("{program} exited with {status}: {stderr}")]
    SourceFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl ExporterError {
    /// Create a new source failure from a finished process.
    pub fn source_failed(program: impl Into<String>, status: ExitStatus, stderr: &[u8]) -> Self {
        Self::SourceFailed {
            program: program.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }
}
