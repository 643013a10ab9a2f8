#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live listings overlay.
//!
//! Reads an out-of-band snapshot of current sale and rental listings,
//! grouped by postcode district, and turns it into a point layer. Every
//! point carries a content-addressed id (a digest of kind and URL) so the
//! serving side can resolve a listing without a lookup table.

pub mod identity;
pub mod overlay;
pub mod snapshot;

use thiserror::Error;

/// Errors that can occur while reading a listings snapshot.
#[derive(Debug, Error)]
pub enum ListingsError {
    /// The snapshot could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Snapshot path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// Snapshot path.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The snapshot is JSON but not shaped like a snapshot.
    #[error("Unexpected snapshot shape in {path}: {message}")]
    Shape {
        /// Snapshot path.
        path: String,
        /// What was wrong.
        message: String,
    },
}
