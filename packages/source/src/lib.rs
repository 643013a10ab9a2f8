#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Timeline definitions, row parsing, and input discovery.
//!
//! A timeline (historical transactions, predicted prices) is described by a
//! [`timeline_def::TimelineDefinition`] loaded from embedded TOML. The
//! definition names the input files, how each row maps onto a
//! [`price_map_source_models::PriceObservation`], and where the output
//! subtree goes. A single generic reader handles every timeline.

pub mod parsing;
pub mod progress;
pub mod registry;
pub mod scan;
pub mod timeline_def;

/// Errors that can occur while reading timeline sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (directory listing, file open).
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV reader error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A required input directory is missing.
    #[error("Required input for timeline '{timeline}' not found: {path}")]
    MissingInput {
        /// Timeline identifier.
        timeline: String,
        /// Directory that was expected.
        path: String,
    },

    /// No timeline with this identifier is configured.
    #[error("Unknown timeline: {0}")]
    UnknownTimeline(String),
}
