//! Cross-type comparison.
//!
//! Every comparison in the language goes through [`compare`], a finite
//! table keyed by the pair of value kinds. Pairs the table does not list are
//! incomparable (`None`), which every comparison operator treats as a
//! definite "no": not equal, not less, not greater.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::value::Value;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Order two values, or `None` when they cannot be compared.
///
/// | left \ right | Number  | String      | Date  | Boolean | List     |
/// |--------------|---------|-------------|-------|---------|----------|
/// | Number       | numeric | if numeric  |       |         |          |
/// | String       | if num. | typed text  | if date | if bool |        |
/// | Date         |         | if date     | time  |         |          |
/// | Boolean      |         | if bool     | f < t |         |          |
/// | List         |         |             |       |         | equality |
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    use Value::*;
    match (left, right) {
        (Number(a), Number(b)) => a.partial_cmp(b),
        (Number(a), String(s)) => parse_number(s).and_then(|b| a.partial_cmp(&b)),
        (String(s), Number(b)) => parse_number(s).and_then(|a| a.partial_cmp(b)),

        (String(a), String(b)) => Some(compare_text(a, b)),

        (Date(a), Date(b)) => Some(a.cmp(b)),
        (Date(a), String(s)) => parse_date(s).map(|b| a.cmp(&b)),
        (String(s), Date(b)) => parse_date(s).map(|a| a.cmp(b)),

        (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
        (Boolean(a), String(s)) => parse_bool(s).map(|b| a.cmp(&b)),
        (String(s), Boolean(b)) => parse_bool(s).map(|a| a.cmp(b)),

        (List(a), List(b)) => {
            let same = a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y));
            same.then_some(Ordering::Equal)
        }

        _ => None,
    }
}

/// Two texts compare as numbers, dates or booleans when both read as one,
/// the same way they would after type inference; otherwise lexically.
fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (parse_number(a), parse_number(b)) {
        if let Some(ordering) = x.partial_cmp(&y) {
            return ordering;
        }
    }
    if let (Some(x), Some(y)) = (parse_date(a), parse_date(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (parse_bool(a), parse_bool(b)) {
        return x.cmp(&y);
    }
    a.cmp(b)
}

/// Loose equality: the pair compares as `Equal`.
pub fn equals(left: &Value, right: &Value) -> bool {
    compare(left, right) == Some(Ordering::Equal)
}

/// Numeric text, surrounding whitespace allowed. Rejects words such as
/// `inf` or `NaN` that `f64::from_str` would otherwise accept.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Date-like text: RFC 3339 (converted to UTC), ISO date/time without an
/// offset, or a plain date.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(d.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(d) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(d);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    None
}

/// `"true"` / `"false"`, any case.
pub fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
