//! Timeline registry: loads all timeline definitions from embedded TOML.
//!
//! Each `.toml` file in `packages/source/timelines/` is baked into the
//! binary at compile time via [`include_str!`].

use crate::SourceError;
use crate::timeline_def::{TimelineDefinition, parse_timeline_toml};

/// TOML configs embedded at compile time, in output order.
const TIMELINE_TOMLS: &[(&str, &str)] = &[
    ("historical", include_str!("../timelines/historical.toml")),
    ("predicted", include_str!("../timelines/predicted.toml")),
];

/// Returns all configured timeline definitions.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (a build-time defect,
/// covered by the tests below).
#[must_use]
pub fn all_timelines() -> Vec<TimelineDefinition> {
    TIMELINE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_timeline_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a configured timeline by id.
///
/// # Errors
///
/// Returns [`SourceError::UnknownTimeline`] if no timeline has this id.
pub fn find_timeline(id: &str) -> Result<TimelineDefinition, SourceError> {
    all_timelines()
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| SourceError::UnknownTimeline(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline_def::RowSchema;

    #[test]
    fn loads_all_timelines() {
        let ids: Vec<String> = all_timelines().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["historical", "predicted"]);
    }

    #[test]
    fn historical_is_required_and_capped() {
        let def = find_timeline("historical").unwrap();
        assert!(def.required);
        assert!(def.accepts_year(2025));
        assert!(!def.accepts_year(2026));
        assert!(matches!(
            def.schema,
            RowSchema::TransactionDate { min_fields: 4, .. }
        ));
    }

    #[test]
    fn predicted_covers_five_target_years() {
        let def = find_timeline("predicted").unwrap();
        assert!(!def.required);
        let years: Vec<i32> = (2020..2040).filter(|y| def.accepts_year(*y)).collect();
        assert_eq!(years, vec![2026, 2027, 2028, 2029, 2030]);
        assert!(matches!(
            def.schema,
            RowSchema::TargetYear { min_fields: 18, year_column: 16, price_column: 17, .. }
        ));
    }

    #[test]
    fn unknown_timeline_is_an_error() {
        assert!(matches!(
            find_timeline("live"),
            Err(SourceError::UnknownTimeline(id)) if id == "live"
        ));
    }
}
