//! The translation pipeline from `nvidia-smi` output to exposition text.
//!
//! A scrape runs source -> [`parser::parse`] -> [`emitter::emit`], with
//! [`normalize::normalize`] applied to every numeric reading on the way out.

pub mod data;
pub mod emitter;
pub mod normalize;
pub mod parser;
pub mod source;
pub mod traits;

// Re-export commonly used items
pub use data::{GpuDevice, NvidiaSmiLog};
pub use emitter::{emit, render};
pub use normalize::normalize;
pub use parser::parse;
pub use source::{FixtureSource, NvidiaSmiSource, SourceConfig};
pub use traits::ReportSource;

use crate::error::Result;

/// Run the full pipeline once against `source` and return the exposition body.
pub async fn scrape(source: &dyn ReportSource) -> Result<String> {
    let raw = source.fetch_report().await?;
    let report = parse(&raw);
    Ok(render(&report))
}
