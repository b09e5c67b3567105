use crate::table::RawValue;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::*;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Text form of a cell, trimmed. Blank cells give `None`.
///
/// Integral floats render without a fraction, so a spreadsheet id read as `1001.0`
/// becomes `"1001"`.
pub fn cell_text(value: &RawValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }

    let text = match value {
        RawValue::Text(text) => text.trim().to_string(),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Float(f) if !f.is_finite() => return None,
        RawValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        RawValue::Float(f) => f.to_string(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        RawValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        RawValue::Null => return None,
    };

    Some(text)
}

/// Interprets a cell as a monetary amount. Numeric text may carry thousands separators.
pub fn parse_amount_cell(value: &RawValue) -> Option<Decimal> {
    match value {
        RawValue::Integer(i) => Some(Decimal::from(*i)),
        RawValue::Float(f) if f.is_finite() => Decimal::from_f64(*f),
        RawValue::Text(text) => parse_amount_text(text),
        _ => None,
    }
}

pub fn parse_amount_text(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&cleaned).ok())
}

/// Interprets a cell as a point in time. Numeric cells are not dates.
pub fn parse_date_cell(value: &RawValue) -> Option<NaiveDateTime> {
    match value {
        RawValue::Date(date) => Some(date.and_time(NaiveTime::MIN)),
        RawValue::DateTime(datetime) => Some(*datetime),
        RawValue::Text(text) => parse_date_text(text),
        _ => None,
    }
}

pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Signed whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Payment terms in days, taken from the first number in the text ("Net 30" -> 30).
pub fn parse_terms_days(terms: &str) -> Option<u32> {
    FIRST_INTEGER
        .find(terms)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `part / whole * 100`, or `None` when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Option<f64> {
    if whole.is_zero() {
        return None;
    }
    Some(part.to_f64()? / whole.to_f64()? * 100.0)
}
