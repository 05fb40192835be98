//! Report sources: the live `nvidia-smi` binary and recorded fixture files.

use crate::error::{ExporterError, Result};
use crate::metrics::traits::ReportSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Arguments requesting the full machine-readable report.
pub const NVIDIA_SMI_ARGS: [&str; 2] = ["-q", "-x"];

/// Runs `nvidia-smi -q -x` and returns its standard output.
#[derive(Debug, Clone)]
pub struct NvidiaSmiSource {
    program: PathBuf,
}

impl NvidiaSmiSource {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ReportSource for NvidiaSmiSource {
    async fn fetch_report(&self) -> Result<Vec<u8>> {
        debug!("Running {} {}", self.program.display(), NVIDIA_SMI_ARGS.join(" "));

        let output = Command::new(&self.program)
            .args(NVIDIA_SMI_ARGS)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExporterError::source_failed(
                self.program.display().to_string(),
                output.status,
                &output.stderr,
            ));
        }

        debug!("nvidia-smi returned {} bytes", output.stdout.len());
        Ok(output.stdout)
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program.display(), NVIDIA_SMI_ARGS.join(" "))
    }
}

/// Reads a previously captured report from disk.
///
/// Relative paths are resolved against the working directory at fetch time.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSource for FixtureSource {
    async fn fetch_report(&self) -> Result<Vec<u8>> {
        debug!("Reading fixture report from {}", self.path.display());
        Ok(tokio::fs::read(&self.path).await?)
    }

    fn describe(&self) -> String {
        format!("fixture {}", self.path.display())
    }
}

/// Which source the exporter reads from; chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Invoke the nvidia-smi executable at `program`
    Live { program: PathBuf },
    /// Read the fixture file at `path`
    Fixture { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Live {
            program: PathBuf::from(crate::DEFAULT_NVIDIA_SMI_PATH),
        }
    }
}

impl SourceConfig {
    /// Select the source from the test-mode switch.
    pub fn from_mode(test_mode: bool, program: impl Into<PathBuf>, fixture: impl Into<PathBuf>) -> Self {
        if test_mode {
            Self::Fixture {
                path: fixture.into(),
            }
        } else {
            Self::Live {
                program: program.into(),
            }
        }
    }

    pub fn is_test_mode(&self) -> bool {
        matches!(self, Self::Fixture { .. })
    }

    /// Build the configured source.
    pub fn build(&self) -> Arc<dyn ReportSource> {
        match self {
            Self::Live { program } => Arc::new(NvidiaSmiSource::new(program.clone())),
            Self::Fixture { path } => Arc::new(FixtureSource::new(path.clone())),
        }
    }
}
