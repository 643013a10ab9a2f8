//! Row-to-observation extraction.
//!
//! Turns the raw fields of one CSV row into a [`PriceObservation`] according
//! to a timeline's [`RowSchema`]. Every field is trimmed before use. Rows
//! that cannot be used are reported with the first [`RejectReason`] hit.

use price_map_source_models::{PriceObservation, RejectReason, is_year_month};

use crate::timeline_def::RowSchema;

/// Extracts an observation from `fields` using `schema`.
///
/// # Errors
///
/// Returns the [`RejectReason`] for rows that are too short, have an
/// unparseable price or target year, an empty date or postcode, or a
/// derived month that is not `YYYY-MM`.
pub fn extract<S: AsRef<str>>(
    fields: &[S],
    schema: &RowSchema,
) -> Result<PriceObservation, RejectReason> {
    match *schema {
        RowSchema::TransactionDate {
            min_fields,
            price_column,
            date_column,
            postcode_column,
        } => {
            if fields.len() < min_fields {
                return Err(RejectReason::TooFewFields);
            }
            let price = field(fields, price_column)
                .parse::<i64>()
                .map_err(|_| RejectReason::BadPrice)?;
            let date = required(fields, date_column, RejectReason::MissingDate)?;
            let postcode = required(fields, postcode_column, RejectReason::MissingPostcode)?;

            let month = prefix_chars(date, 7);
            if !is_year_month(month) {
                return Err(RejectReason::BadMonth);
            }

            Ok(PriceObservation::new(price, month.to_string(), postcode))
        }
        RowSchema::TargetYear {
            min_fields,
            date_column,
            postcode_column,
            year_column,
            price_column,
        } => {
            if fields.len() < min_fields {
                return Err(RejectReason::TooFewFields);
            }
            let date = required(fields, date_column, RejectReason::MissingDate)?;
            let postcode = required(fields, postcode_column, RejectReason::MissingPostcode)?;
            let year = field(fields, year_column)
                .parse::<i32>()
                .map_err(|_| RejectReason::BadTargetYear)?;
            let month = format!("{year}-{}", char_range(date, 5, 7));
            if !is_year_month(&month) {
                return Err(RejectReason::BadMonth);
            }
            let price = parse_rounded_price(field(fields, price_column))?;

            Ok(PriceObservation::new(price, month, postcode))
        }
    }
}

/// Trimmed field at `index`, or `""` when the row is shorter.
fn field<S: AsRef<str>>(fields: &[S], index: usize) -> &str {
    fields.get(index).map_or("", |f| f.as_ref().trim())
}

fn required<S: AsRef<str>>(
    fields: &[S],
    index: usize,
    reason: RejectReason,
) -> Result<&str, RejectReason> {
    let value = field(fields, index);
    if value.is_empty() {
        Err(reason)
    } else {
        Ok(value)
    }
}

/// Parses a float price and rounds half-to-even.
#[allow(clippy::cast_possible_truncation)]
fn parse_rounded_price(raw: &str) -> Result<i64, RejectReason> {
    let value = raw.parse::<f64>().map_err(|_| RejectReason::BadPrice)?;
    if !value.is_finite() || value.abs() >= 9.0e18 {
        return Err(RejectReason::BadPrice);
    }
    Ok(value.round_ties_even() as i64)
}

/// First `n` characters of `s` (all of it when shorter).
fn prefix_chars(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i])
}

/// Characters `start..end` of `s`, clamped to its length.
fn char_range(s: &str, start: usize, end: usize) -> &str {
    let rest = s.char_indices().nth(start).map_or("", |(i, _)| &s[i..]);
    prefix_chars(rest, end - start)
}
