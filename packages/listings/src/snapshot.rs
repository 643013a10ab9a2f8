//! Live listings snapshot loading.
//!
//! The snapshot is produced out of band by a scraper. Its shape is only
//! loosely trusted: the top level must be an object with an `areas` object
//! keyed by district code; everything below that is read leniently and
//! entries of the wrong shape are counted and skipped by the overlay.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::ListingsError;

/// A parsed snapshot document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// File the snapshot was read from.
    pub source: PathBuf,
    /// District code -> `{saleListings, rentListings}`.
    pub areas: Map<String, Value>,
    /// The snapshot's own `meta` block, passed through verbatim.
    pub meta: Value,
}

impl Snapshot {
    /// Builds a snapshot from an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`ListingsError::Shape`] if the document has no `areas`
    /// object.
    pub fn from_value(source: PathBuf, mut document: Value) -> Result<Self, ListingsError> {
        let Some(root) = document.as_object_mut() else {
            return Err(ListingsError::Shape {
                path: source.display().to_string(),
                message: "top level is not an object".to_string(),
            });
        };

        let meta = root.remove("meta").unwrap_or(Value::Null);
        let areas = match root.remove("areas") {
            Some(Value::Object(areas)) => areas,
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(ListingsError::Shape {
                    path: source.display().to_string(),
                    message: "`areas` is not an object".to_string(),
                });
            }
        };

        Ok(Self {
            source,
            areas,
            meta,
        })
    }
}

/// Reads and parses the snapshot at `path`.
///
/// # Errors
///
/// Returns [`ListingsError`] if the file cannot be read, is not JSON, or
/// has the wrong top-level shape.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, ListingsError> {
    let bytes = std::fs::read(path).map_err(|e| ListingsError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let document: Value = serde_json::from_slice(&bytes).map_err(|e| ListingsError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    Snapshot::from_value(path.to_path_buf(), document)
}

/// Loads the first existing snapshot among `candidates`.
///
/// A missing or unreadable snapshot is not an error: the overlay is simply
/// skipped, so this logs and returns `None`.
#[must_use]
pub fn load_snapshot(candidates: &[PathBuf]) -> Option<Snapshot> {
    let Some(path) = candidates.iter().find(|p| p.is_file()) else {
        log::info!("No live listings snapshot found; skipping overlay");
        return None;
    };

    match read_snapshot(path) {
        Ok(snapshot) => {
            log::info!(
                "Loaded live snapshot {} ({} districts)",
                path.display(),
                snapshot.areas.len()
            );
            Some(snapshot)
        }
        Err(e) => {
            log::warn!("Ignoring live snapshot: {e}");
            None
        }
    }
}
