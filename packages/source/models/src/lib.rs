#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Price observation and row rejection types.
//!
//! Every timeline source (historical transactions, predicted prices)
//! produces [`PriceObservation`] records of the same shape; rows that fail
//! validation are reported as a [`RejectReason`] instead.

use price_map_geography_models::{GeoHierarchy, PostcodeCode, normalize, parse};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One accepted row of a timeline source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Price in whole units (consistent within a dataset).
    pub price: i64,
    /// Bucket month (`YYYY-MM`).
    pub month: String,
    /// Normalized postcode key.
    pub postcode: PostcodeCode,
    /// Area/district/sector codes derived from the raw postcode.
    pub hierarchy: GeoHierarchy,
}

impl PriceObservation {
    /// Builds an observation from the raw postcode text as it appeared in
    /// the row.
    #[must_use]
    pub fn new(price: i64, month: String, raw_postcode: &str) -> Self {
        Self {
            price,
            month,
            postcode: normalize(raw_postcode),
            hierarchy: parse(raw_postcode),
        }
    }
}

/// Why a row was skipped.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Fewer fields than the schema requires.
    TooFewFields,
    /// Price field is not a number.
    BadPrice,
    /// Date field is empty.
    MissingDate,
    /// Postcode field is empty.
    MissingPostcode,
    /// Derived month is not `YYYY-MM`.
    BadMonth,
    /// Prediction target-year column is not an integer.
    BadTargetYear,
}

impl RejectReason {
    /// Every reason, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::TooFewFields,
        Self::BadPrice,
        Self::MissingDate,
        Self::MissingPostcode,
        Self::BadMonth,
        Self::BadTargetYear,
    ];
}

/// Returns `true` if `month` is exactly `YYYY-MM` with a month in `01..=12`.
#[must_use]
pub fn is_year_month(month: &str) -> bool {
    let bytes = month.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    if !bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit) {
        return false;
    }
    month[5..]
        .parse::<u8>()
        .is_ok_and(|m| (1..=12).contains(&m))
}
