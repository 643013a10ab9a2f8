#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid-to-geodetic conversion, postcode coordinates, and boundary
//! resolution.
//!
//! Turns the national grid references published with the postcode
//! reference data into map coordinates, and resolves the area, district,
//! and sector boundary polygons the choropleth layers are drawn from.

pub mod boundaries;
pub mod grid;
pub mod postcodes;

use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// I/O error reading an input or writing an artifact.
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

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking loader task panicked or was cancelled.
    #[error("Boundary loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl GeoError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
