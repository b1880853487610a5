use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date validation pattern to compile"));

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Checks a `YYYY-MM-DD` date string for shape and calendar validity.
pub fn is_valid_date(value: &str) -> bool {
    DATE_PATTERN.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

pub const MS_PER_DAY: i64 = 86_400_000;
