//! Locale-tolerant date and decimal parsers.
//!
//! Raw exports arrive with dates in half a dozen encodings and numbers
//! formatted under whichever locale produced them. Both parsers here try a
//! fixed, documented precedence so the same input always yields the same
//! value on every host.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Explicit date formats, tried in order. `MM/dd` and `dd/MM` are ambiguous
/// for inputs like `03/04/2024`; the list order resolves the ambiguity in
/// favour of month-first, so it must not be reordered.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y%m%d %H%M%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%d/%m/%Y", "%Y%m%d"];

/// Free-form fallbacks after the explicit list is exhausted.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Attempts to parse `input` as a date or date-time; first matching format wins.
///
/// Date-only matches are promoted to midnight so every successful parse
/// yields a [`NaiveDateTime`].
pub fn parse_date_flexible(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    for pair in DATETIME_FORMATS
        .iter()
        .zip(DATE_FORMATS.iter())
        .flat_map(|(dt, d)| [(*d, false), (*dt, true)])
    {
        // Each explicit encoding is tried date-first, then with a time part,
        // preserving the documented yyyy-MM-dd .. yyyyMMdd HHmmss sequence.
        let (fmt, with_time) = pair;
        if with_time {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(parsed);
            }
        } else if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    for fmt in FALLBACK_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    None
}

/// Attempts to parse `input` as a decimal, tolerating grouping separators.
///
/// Internal spaces and non-breaking spaces are stripped first. The invariant
/// form (`.` decimal point) is tried before separator normalization, so
/// `1,234.56` and `1 234,56` both resolve to 1234.56.
pub fn parse_decimal_flexible(input: &str) -> Option<Decimal> {
    let stripped: String = input
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{00A0}')
        .collect();
    if stripped.is_empty() {
        return None;
    }
    if let Ok(parsed) = stripped.parse::<Decimal>() {
        return Some(parsed);
    }
    if let Ok(parsed) = Decimal::from_scientific(&stripped) {
        return Some(parsed);
    }
    normalize_separators(&stripped)?.parse::<Decimal>().ok()
}

/// Rewrites grouping/decimal separators into the invariant form.
fn normalize_separators(s: &str) -> Option<String> {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            // Both present: the rightmost separator is the decimal point.
            let (decimal, grouping) = if dot > comma { ('.', ',') } else { (',', '.') };
            let without_groups: String = s.chars().filter(|c| *c != grouping).collect();
            Some(without_groups.replace(decimal, "."))
        }
        (None, Some(_)) => {
            // Commas only: a single comma is a decimal point, repeated commas
            // are grouping.
            if s.matches(',').count() == 1 {
                Some(s.replace(',', "."))
            } else {
                Some(s.replace(',', ""))
            }
        }
        (Some(_), None) => {
            // Dots only: the single-dot form already failed the invariant
            // parse above, so repeated dots are grouping.
            if s.matches('.').count() > 1 {
                Some(s.replace('.', ""))
            } else {
                None
            }
        }
        (None, None) => None,
    }
}
