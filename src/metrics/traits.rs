//! Traits for obtaining nvidia-smi reports.

use crate::error::Result;
use async_trait::async_trait;

/// Source of raw `nvidia-smi -q -x` report bytes.
///
/// The rest of the pipeline only ever sees the returned bytes, so the live
/// tool and a recorded fixture are interchangeable. Implementations hold no
/// mutable state; one instance is shared by every in-flight scrape.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch one complete report.
    async fn fetch_report(&self) -> Result<Vec<u8>>;

    /// Short human-readable description used in logs and `/health`.
    fn describe(&self) -> String;
}
