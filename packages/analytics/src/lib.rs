#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Streaming price aggregation and choropleth ranges.
//!
//! Timeline files are scanned in parallel into per-level, per-month,
//! per-code price buckets. From those buckets this crate derives the stats
//! documents (median, mean, count) and the 10th/90th percentile ranges the
//! map colors are normalized against.

pub mod aggregate;
pub mod engine;
pub mod ranges;

use price_map_source::SourceError;
use thiserror::Error;

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Input discovery or file access failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A scan worker panicked or was cancelled.
    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
