//! Config-driven timeline definition.
//!
//! [`TimelineDefinition`] captures everything unique about one timeline:
//! which files feed it, how a row becomes a price observation, and which
//! output subtree it is written to. Historical and predicted data share
//! one code path and differ only in their definitions.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// A complete timeline definition, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineDefinition {
    /// Unique identifier (e.g., `"historical"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Input directory relative to the data root.
    pub input_dir: String,
    /// File-name prefix before the year (e.g. `bulk_property_predictions_`).
    #[serde(default)]
    pub file_prefix: String,
    /// Earliest file year to read (inclusive).
    #[serde(default)]
    pub min_year: Option<i32>,
    /// Latest file year to read (inclusive).
    #[serde(default)]
    pub max_year: Option<i32>,
    /// Whether a missing input directory aborts the run.
    #[serde(default)]
    pub required: bool,
    /// Output subtree relative to the artifact root.
    pub output_dir: String,
    /// How rows map onto observations.
    pub schema: RowSchema,
}

impl TimelineDefinition {
    /// Absolute input directory under `root`.
    #[must_use]
    pub fn input_path(&self, root: &Path) -> PathBuf {
        root.join(&self.input_dir)
    }

    /// Returns `true` if a file for `year` belongs to this timeline.
    #[must_use]
    pub fn accepts_year(&self, year: i32) -> bool {
        self.min_year.is_none_or(|min| year >= min) && self.max_year.is_none_or(|max| year <= max)
    }
}

/// Column layout and month-extraction rule of a timeline's rows.
///
/// Column indexes are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowSchema {
    /// Month is the first seven characters of the transaction date; the
    /// price is an integer.
    TransactionDate {
        /// Minimum number of fields for a row to be considered.
        min_fields: usize,
        /// Integer price column.
        price_column: usize,
        /// Transaction date column (`YYYY-MM-DD ...`).
        date_column: usize,
        /// Postcode column.
        postcode_column: usize,
    },
    /// Month is `{target year}-{month of the transaction date}`; the price is
    /// a float rounded to the nearest integer.
    TargetYear {
        /// Minimum number of fields for a row to be considered.
        min_fields: usize,
        /// Transaction date column supplying the calendar month.
        date_column: usize,
        /// Postcode column.
        postcode_column: usize,
        /// Prediction target-year column.
        year_column: usize,
        /// Predicted price column.
        price_column: usize,
    },
}

/// Parses a TOML string into a [`TimelineDefinition`].
///
/// # Errors
///
/// Returns an error if the TOML is malformed or missing required fields.
pub fn parse_timeline_toml(toml_str: &str) -> Result<TimelineDefinition, toml::de::Error> {
    toml::from_str(toml_str)
}
