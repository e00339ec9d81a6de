use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::Result;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2030;

lazy_static! {
    static ref YEAR_PATTERN: Regex = Regex::new(r"\b(19\d{2}|2\d{3})\b").unwrap();
}

/// Serialize `value` to JSON and pull every plausible year out of the text.
///
/// This is a heuristic. Any standalone four digit run in range counts, so
/// numbers inside URLs or unrelated figures show up as well.
pub fn extract_years<T: Serialize + ?Sized>(value: &T, min_year: i32, max_year: i32) -> Result<Vec<i32>> {
    let text = serde_json::to_string(value)?;
    Ok(extract_years_from_text(&text, min_year, max_year))
}

/// Years in order of appearance; duplicates are kept.
pub fn extract_years_from_text(text: &str, min_year: i32, max_year: i32) -> Vec<i32> {
    YEAR_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .filter(|year| (min_year..=max_year).contains(year))
        .collect()
}
