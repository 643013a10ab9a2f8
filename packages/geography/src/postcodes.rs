//! Postcode coordinate reference loading.
//!
//! The reference data is a directory of headerless CSV files, one row per
//! postcode: `"E1 0AA",10,535267,181084,...` where field 0 is the postcode
//! and fields 2/3 are the easting and northing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use price_map_geography_models::{GeoPoint, GridReference, PostcodeCode, normalize};

use crate::GeoError;
use crate::grid::grid_to_geo;

/// Where a postcode is drawn, plus its display form.
#[derive(Debug, Clone, PartialEq)]
pub struct PostcodeLocation {
    /// Converted coordinate.
    pub point: GeoPoint,
    /// The postcode as written in the reference data (e.g. `E1 0AA`).
    pub display: String,
}

/// Normalized postcode -> location lookup.
#[derive(Debug, Default)]
pub struct PostcodeCoordinates {
    entries: HashMap<PostcodeCode, PostcodeLocation>,
}

impl PostcodeCoordinates {
    /// Looks up a normalized postcode.
    #[must_use]
    pub fn get(&self, code: &PostcodeCode) -> Option<&PostcodeLocation> {
        self.entries.get(code)
    }

    /// Number of postcodes loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no postcodes were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a location for a raw postcode; later inserts win.
    pub fn insert(&mut self, raw_postcode: &str, grid: GridReference) {
        let code = normalize(raw_postcode);
        if code.is_empty() {
            return;
        }
        self.entries.insert(
            code,
            PostcodeLocation {
                point: grid_to_geo(grid),
                display: raw_postcode.trim().to_string(),
            },
        );
    }
}

/// Loads every `.csv` file directly under `dir`, in file-name order.
///
/// A missing directory yields an empty lookup (points are then omitted from
/// the point layers) and is logged as a warning.
///
/// # Errors
///
/// Returns [`GeoError`] if the directory or a file cannot be read.
pub fn load_dir(dir: &Path) -> Result<PostcodeCoordinates, GeoError> {
    let mut coords = PostcodeCoordinates::default();

    if !dir.is_dir() {
        log::warn!(
            "Postcode reference directory {} not found; point layers will be empty",
            dir.display()
        );
        return Ok(coords);
    }

    for file in csv_files(dir)? {
        let loaded = load_file(&file, &mut coords)?;
        log::debug!("  {}: {loaded} postcodes", file.display());
    }

    Ok(coords)
}

/// Reads one reference file into `coords`, returning the rows accepted.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be opened.
pub fn load_file(path: &Path, coords: &mut PostcodeCoordinates) -> Result<u64, GeoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| GeoError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;

    let mut count = 0u64;
    for result in reader.byte_records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed row: {e}");
                continue;
            }
        };

        let Some((postcode, grid)) = parse_reference_row(&record) else {
            continue;
        };

        coords.insert(&postcode, grid);
        count += 1;
    }

    Ok(count)
}

fn parse_reference_row(record: &csv::ByteRecord) -> Option<(String, GridReference)> {
    if record.len() < 4 {
        return None;
    }
    let postcode = String::from_utf8_lossy(record.get(0)?).replace('"', "");
    if postcode.trim().is_empty() {
        return None;
    }
    let easting = std::str::from_utf8(record.get(2)?).ok()?.trim().parse().ok()?;
    let northing = std::str::from_utf8(record.get(3)?).ok()?.trim().parse().ok()?;
    Some((postcode, GridReference::new(easting, northing)))
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, GeoError> {
    let entries = std::fs::read_dir(dir).map_err(|e| GeoError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| GeoError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_reference_rows_and_skips_junk() {
        let tmp = std::env::temp_dir().join("price_map_postcodes_load");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        std::fs::write(
            tmp.join("e.csv"),
            "\"E1 0AA\",10,535267,181084,\"E92000001\"\n\
             Postcode,Quality,Eastings,Northings\n\
             \"E1 0AB\",10,not-a-number,181084\n\
             \"E1 0AD\",10\n",
        )
        .unwrap();
        std::fs::write(tmp.join("notes.txt"), "ignored").unwrap();

        let coords = load_dir(&tmp).unwrap();
        assert_eq!(coords.len(), 1);

        let location = coords.get(&normalize("e1 0aa")).unwrap();
        assert_eq!(location.display, "E1 0AA");
        assert!((location.point.lat - 51.511_986).abs() < 1e-5);
        assert!((location.point.lng - -0.050_483).abs() < 1e-5);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = std::env::temp_dir().join("price_map_postcodes_missing");
        let _ = std::fs::remove_dir_all(&tmp);
        let coords = load_dir(&tmp).unwrap();
        assert!(coords.is_empty());
    }
}
