//! Boundary polygon resolution.
//!
//! Each level (area, district, sector) is loaded from a directory tree of
//! per-code `GeoJSON` files. When that primary source yields nothing for a
//! level, geometry is recovered from previously emitted artifacts through
//! the [`BoundaryCache`], so a run with an incomplete input set still
//! produces polygons.
//!
//! The cache also owns the write side: an empty set never replaces a
//! published collection that already holds features.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, feature::Id};
use price_map_geography_models::{BoundaryFeature, BoundarySet, GeoLevel};

use crate::GeoError;

/// Name of the shared polygon directory under the output root.
pub const POLYGON_DIR: &str = "polygons";

/// Result of a [`BoundaryCache::store`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The collection was written with this many features.
    Written(usize),
    /// The set was empty and an existing non-empty file was left untouched.
    Kept,
    /// The set was empty and there was nothing worth keeping; no file written.
    Skipped,
}

/// Read/write access to previously emitted boundary geometry.
#[derive(Debug, Clone)]
pub struct BoundaryCache {
    root: PathBuf,
}

impl BoundaryCache {
    /// Creates a cache rooted at the artifact output directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the published collection for `level`
    /// (e.g. `polygons/districts.geojson`).
    #[must_use]
    pub fn published_path(&self, level: GeoLevel) -> PathBuf {
        self.root
            .join(POLYGON_DIR)
            .join(format!("{}.geojson", level.plural()))
    }

    /// Directory of legacy per-month collections for `level`
    /// (e.g. `district_geojson/`).
    #[must_use]
    pub fn legacy_dir(&self, level: GeoLevel) -> PathBuf {
        self.root.join(format!("{}_geojson", level.as_ref()))
    }

    /// Recovers boundaries for `level` from prior output.
    ///
    /// Tries the published collection first, then the first legacy monthly
    /// collection in file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if an existing file cannot be read.
    pub fn load(&self, level: GeoLevel) -> Result<BoundarySet, GeoError> {
        let published = self.published_path(level);
        if published.is_file() {
            let set = read_collection(&published, level)?;
            if !set.is_empty() {
                log::info!(
                    "{level}: recovered {} boundaries from {}",
                    set.len(),
                    published.display()
                );
                return Ok(set);
            }
        }

        let legacy_dir = self.legacy_dir(level);
        if !legacy_dir.is_dir() {
            return Ok(BoundarySet::new());
        }

        let mut candidates = geojson_files(&legacy_dir, false)?;
        candidates.sort();
        let Some(sample) = candidates.first() else {
            return Ok(BoundarySet::new());
        };

        let set = read_collection(sample, level)?;
        if !set.is_empty() {
            log::info!(
                "{level}: recovered {} boundaries from legacy {}",
                set.len(),
                sample.display()
            );
        }
        Ok(set)
    }

    /// Publishes `set` as the collection for `level`.
    ///
    /// An empty `set` is never written; an existing file with at least one
    /// feature is left exactly as it is.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be written.
    pub fn store(&self, level: GeoLevel, set: &BoundarySet) -> Result<StoreOutcome, GeoError> {
        let path = self.published_path(level);

        if set.is_empty() {
            if path.is_file() && !read_collection(&path, level)?.is_empty() {
                log::info!(
                    "{level}: no boundaries resolved, keeping existing {}",
                    path.display()
                );
                return Ok(StoreOutcome::Kept);
            }
            log::warn!("{level}: no boundaries resolved, nothing written");
            return Ok(StoreOutcome::Skipped);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GeoError::io(parent, e))?;
        }

        let collection = to_feature_collection(level, set);
        let tmp_path = path.with_extension("geojson.tmp");
        let file = File::create(&tmp_path).map_err(|e| GeoError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &collection)?;
        writer.flush().map_err(|e| GeoError::io(&tmp_path, e))?;
        drop(writer);
        std::fs::rename(&tmp_path, &path).map_err(|e| GeoError::io(&path, e))?;

        Ok(StoreOutcome::Written(set.len()))
    }
}

/// Loads primary boundary files and falls back to a [`BoundaryCache`].
#[derive(Debug, Clone)]
pub struct BoundaryResolver {
    primary_root: Option<PathBuf>,
    cache: BoundaryCache,
}

/// Resolved boundaries for all three polygon levels.
#[derive(Debug, Clone, Default)]
pub struct Boundaries {
    /// Area polygons.
    pub area: BoundarySet,
    /// District polygons.
    pub district: BoundarySet,
    /// Sector polygons.
    pub sector: BoundarySet,
}

impl Boundaries {
    /// Returns the set for `level` (`None` for the postcode level).
    #[must_use]
    pub const fn get(&self, level: GeoLevel) -> Option<&BoundarySet> {
        match level {
            GeoLevel::Area => Some(&self.area),
            GeoLevel::District => Some(&self.district),
            GeoLevel::Sector => Some(&self.sector),
            GeoLevel::Postcode => None,
        }
    }
}

impl BoundaryResolver {
    /// Creates a resolver.
    ///
    /// `primary_root` holds `areas/`, `districts/` and `sectors/`
    /// subdirectories; `None` means the primary source is unavailable.
    #[must_use]
    pub const fn new(primary_root: Option<PathBuf>, cache: BoundaryCache) -> Self {
        Self {
            primary_root,
            cache,
        }
    }

    /// The cache used for fallback reads.
    #[must_use]
    pub const fn cache(&self) -> &BoundaryCache {
        &self.cache
    }

    /// Resolves one level: primary files first, cache when that is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if a directory or file cannot be read.
    pub fn resolve_level(&self, level: GeoLevel) -> Result<BoundarySet, GeoError> {
        let primary = match &self.primary_root {
            Some(root) => load_primary_level(&root.join(level.plural()))?,
            None => BoundarySet::new(),
        };

        if !primary.is_empty() {
            log::info!("{level}: loaded {} primary boundaries", primary.len());
            return Ok(primary);
        }

        log::info!("{level}: primary boundaries unavailable, trying previous output");
        self.cache.load(level)
    }

    /// Resolves all three levels concurrently on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if any level fails to load.
    pub async fn resolve_all(&self) -> Result<Boundaries, GeoError> {
        let spawn = |level: GeoLevel| {
            let resolver = self.clone();
            tokio::task::spawn_blocking(move || resolver.resolve_level(level))
        };

        let area = spawn(GeoLevel::Area);
        let district = spawn(GeoLevel::District);
        let sector = spawn(GeoLevel::Sector);

        Ok(Boundaries {
            area: area.await??,
            district: district.await??,
            sector: sector.await??,
        })
    }
}

/// Loads every `*.geojson` file under `dir` (recursively), keyed by file
/// stem. A missing directory yields an empty set.
///
/// # Errors
///
/// Returns [`GeoError`] if the directory tree or a file cannot be read.
pub fn load_primary_level(dir: &Path) -> Result<BoundarySet, GeoError> {
    let mut set = BoundarySet::new();
    if !dir.is_dir() {
        return Ok(set);
    }

    let mut files = geojson_files(dir, true)?;
    files.sort();

    for path in files {
        let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(geojson) = read_geojson(&path)? else {
            continue;
        };
        let Some(geometry) = first_geometry(geojson) else {
            log::warn!("No geometry in boundary file {}", path.display());
            continue;
        };
        set.insert(
            code.to_string(),
            BoundaryFeature {
                code: code.to_string(),
                geometry,
            },
        );
    }

    Ok(set)
}

/// Returns the geometry of a bare geometry, a feature, or the first feature
/// of a collection.
#[must_use]
pub fn first_geometry(geojson: GeoJson) -> Option<geojson::Geometry> {
    match geojson {
        GeoJson::Geometry(geometry) => Some(geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .next()
            .and_then(|feature| feature.geometry),
    }
}

/// Builds the published collection for `level`: one feature per code with
/// `id = code` and a single `{<level>: code}` property.
#[must_use]
pub fn to_feature_collection(level: GeoLevel, set: &BoundarySet) -> FeatureCollection {
    let features = set
        .values()
        .map(|boundary| {
            let mut properties = JsonObject::new();
            properties.insert(
                level.as_ref().to_string(),
                serde_json::Value::String(boundary.code.clone()),
            );
            Feature {
                bbox: None,
                geometry: Some(boundary.geometry.clone()),
                id: Some(Id::String(boundary.code.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Reads a feature collection keyed by `properties.<level>` (or the feature
/// id), dropping features without a code or geometry.
fn read_collection(path: &Path, level: GeoLevel) -> Result<BoundarySet, GeoError> {
    let mut set = BoundarySet::new();
    let Some(GeoJson::FeatureCollection(collection)) = read_geojson(path)? else {
        return Ok(set);
    };

    for feature in collection.features {
        let code = feature
            .property(level.as_ref())
            .and_then(code_from_value)
            .or_else(|| match &feature.id {
                Some(Id::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Id::Number(n)) => Some(n.to_string()),
                _ => None,
            });
        let (Some(code), Some(geometry)) = (code, feature.geometry) else {
            continue;
        };
        set.insert(code.clone(), BoundaryFeature { code, geometry });
    }

    Ok(set)
}

fn code_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a `GeoJSON` file. Unparseable content (including bytes that are
/// not UTF-8) is logged and treated as absent.
fn read_geojson(path: &Path) -> Result<Option<GeoJson>, GeoError> {
    let bytes = std::fs::read(path).map_err(|e| GeoError::io(path, e))?;
    let Ok(text) = std::str::from_utf8(&bytes) else {
        log::warn!("Skipping non-UTF-8 GeoJSON {}", path.display());
        return Ok(None);
    };
    match text.parse::<GeoJson>() {
        Ok(geojson) => Ok(Some(geojson)),
        Err(e) => {
            log::warn!("Skipping unparseable GeoJSON {}: {e}", path.display());
            Ok(None)
        }
    }
}

fn geojson_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, GeoError> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| GeoError::io(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| GeoError::io(dir, e))?.path();
        if path.is_dir() {
            if recursive {
                files.extend(geojson_files(&path, true)?);
            }
        } else if path.extension().is_some_and(|ext| ext == "geojson") {
            files.push(path);
        }
    }

    Ok(files)
}
