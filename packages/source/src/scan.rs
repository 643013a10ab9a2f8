//! Input discovery and streaming row scans.
//!
//! Timeline inputs are directories of per-year CSV files named
//! `{file_prefix}{year}.csv`. Files are visited in file-name order and
//! streamed row by row; nothing is buffered beyond the current record.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use price_map_source_models::{PriceObservation, RejectReason};

use crate::SourceError;
use crate::parsing::extract;
use crate::timeline_def::{RowSchema, TimelineDefinition};

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File path.
    pub path: PathBuf,
    /// Year parsed from the file name.
    pub year: i32,
}

/// Row counts from scanning one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Rows turned into observations.
    pub accepted: u64,
    /// Rows rejected by validation.
    pub rejected: u64,
    /// Records the CSV reader could not decode.
    pub malformed: u64,
}

/// Lists the input files of `def` under `root`, sorted by file name.
///
/// Files whose stem is not `{file_prefix}{year}` or whose year is outside
/// the definition's bounds are ignored.
///
/// # Errors
///
/// Returns [`SourceError::MissingInput`] if the input directory does not
/// exist and the timeline is required, or [`SourceError::Io`] if it cannot
/// be listed. A missing optional directory yields no files.
pub fn discover_files(root: &Path, def: &TimelineDefinition) -> Result<Vec<InputFile>, SourceError> {
    let dir = def.input_path(root);

    if !dir.is_dir() {
        if def.required {
            return Err(SourceError::MissingInput {
                timeline: def.id.clone(),
                path: dir.display().to_string(),
            });
        }
        log::warn!(
            "No input directory for {} at {}; skipping",
            def.name,
            dir.display()
        );
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(&dir, e))?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "csv") {
            continue;
        }
        let Some(year) = file_year(&path, &def.file_prefix) else {
            log::debug!("Ignoring {}: no year in file name", path.display());
            continue;
        };
        if def.accepts_year(year) {
            files.push(InputFile { path, year });
        } else {
            log::debug!("Ignoring {}: year {year} out of range", path.display());
        }
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

fn file_year(path: &Path, prefix: &str) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(prefix)?.parse().ok()
}

/// Streams every row of `path` through `schema`.
///
/// Accepted rows go to `on_observation`, rejected rows to `on_reject`.
/// The file is headerless; bytes that are not valid UTF-8 are replaced
/// rather than failing the row.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if the file cannot be opened.
pub fn scan_file(
    path: &Path,
    schema: &RowSchema,
    mut on_observation: impl FnMut(PriceObservation),
    mut on_reject: impl FnMut(RejectReason),
) -> Result<ScanSummary, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SourceError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;

    let mut summary = ScanSummary::default();

    for result in reader.byte_records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed row in {}: {e}", path.display());
                summary.malformed += 1;
                continue;
            }
        };

        let fields: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();

        match extract(&fields, schema) {
            Ok(obs) => {
                summary.accepted += 1;
                on_observation(obs);
            }
            Err(reason) => {
                summary.rejected += 1;
                on_reject(reason);
            }
        }
    }

    Ok(summary)
}

fn io_error(path: &Path, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.display().to_string(),
        source,
    }
}
