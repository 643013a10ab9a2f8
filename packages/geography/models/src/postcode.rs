//! Postcode normalization and hierarchy decomposition.
//!
//! A postcode such as `"sw1a 1aa"` is keyed by its normalized form
//! (`SW1A1AA`) and bucketed into three coarser levels derived from the
//! outward and inward parts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GeoLevel;

/// A normalized postcode: uppercase with all whitespace removed.
///
/// Only [`normalize`] constructs this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostcodeCode(String);

impl PostcodeCode {
    /// Returns the normalized postcode text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if normalization left nothing behind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PostcodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PostcodeCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Area, district, and sector codes derived from one postcode.
///
/// Empty strings mean "unassignable" and must never be used as a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoHierarchy {
    /// Leading alphabetic prefix of the district (e.g. `SW`).
    pub area: String,
    /// The raw outward code (e.g. `SW1A`).
    pub district: String,
    /// `district + " " + first inward char`, or the district when there is
    /// no inward part.
    pub sector: String,
}

impl GeoHierarchy {
    /// Returns the code for `level`, or `None` when it is empty or the level
    /// is not part of the hierarchy.
    #[must_use]
    pub fn code(&self, level: GeoLevel) -> Option<&str> {
        let code = match level {
            GeoLevel::Area => &self.area,
            GeoLevel::District => &self.district,
            GeoLevel::Sector => &self.sector,
            GeoLevel::Postcode => return None,
        };
        (!code.is_empty()).then_some(code.as_str())
    }
}

/// Normalizes raw postcode text into a map key.
#[must_use]
pub fn normalize(raw: &str) -> PostcodeCode {
    PostcodeCode(
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect(),
    )
}

/// Decomposes raw postcode text into its [`GeoHierarchy`].
///
/// Operates on the uppercased, whitespace-separated form so that the
/// outward/inward split survives. Never fails: malformed input yields
/// empty codes.
#[must_use]
pub fn parse(raw: &str) -> GeoHierarchy {
    let upper = raw.trim().to_uppercase();
    let mut parts = upper.split_whitespace();

    let Some(outward) = parts.next() else {
        return GeoHierarchy::default();
    };

    let area: String = outward.chars().take_while(|c| c.is_alphabetic()).collect();

    let sector = match parts.next().and_then(|inward| inward.chars().next()) {
        Some(first) => format!("{outward} {first}"),
        None => outward.to_string(),
    };

    GeoHierarchy {
        area,
        district: outward.to_string(),
        sector,
    }
}
