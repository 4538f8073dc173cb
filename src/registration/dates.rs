//! Date-of-birth normalization.
//!
//! Patients and OCR output write dates every which way. Everything accepted
//! here is turned into a calendar-checked `NaiveDate`; rendering as ISO
//! `YYYY-MM-DD` is left to the caller.
//!
//! Numeric dates are read day-first (`03/04/1990` is 3 April), falling back
//! to month-first only when day-first cannot be a real date.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

static ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$").unwrap());

static COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap());

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})$").unwrap());

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s*(?:of\s+)?[-\s]?([a-z]+)\.?[-,\s]\s*(\d{4})$")
        .unwrap()
});

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$").unwrap()
});

/// Parse a free-form date. `today` anchors two-digit years.
pub fn normalize_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let input = raw.trim().trim_end_matches('.').trim();
    if input.is_empty() {
        return None;
    }

    if let Some(c) = ISO.captures(input) {
        return ymd(num(&c[1])?, num(&c[2])?, num(&c[3])?);
    }

    if let Some(c) = COMPACT.captures(input) {
        return ymd(num(&c[1])?, num(&c[2])?, num(&c[3])?);
    }

    if let Some(c) = NUMERIC.captures(input) {
        let first = num(&c[1])?;
        let second = num(&c[2])?;
        let year = expand_year(&c[3], today)?;
        return ymd(year, second, first).or_else(|| ymd(year, first, second));
    }

    if let Some(c) = DAY_MONTH_YEAR.captures(input) {
        let month = month_from_name(&c[2])?;
        return ymd(num(&c[3])?, month, num(&c[1])?);
    }

    if let Some(c) = MONTH_DAY_YEAR.captures(input) {
        let month = month_from_name(&c[1])?;
        return ymd(num(&c[3])?, month, num(&c[2])?);
    }

    None
}

fn num(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Two-digit years land in the current century unless that would be in the
/// future, in which case the previous century is used.
fn expand_year(digits: &str, today: NaiveDate) -> Option<u32> {
    let value = num(digits)?;
    if digits.len() == 4 {
        return Some(value);
    }
    let current = u32::try_from(today.year()).ok()?;
    let century = current / 100 * 100;
    let candidate = century + value;
    Some(if candidate > current { candidate - 100 } else { candidate })
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn iso(raw: &str) -> Option<String> {
        normalize_date(raw, today()).map(|d| d.format("%Y-%m-%d").to_string())
    }

    #[test]
    fn iso_and_compact_forms() {
        assert_eq!(iso("1990-03-12").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("1990/3/2").as_deref(), Some("1990-03-02"));
        assert_eq!(iso("19900312").as_deref(), Some("1990-03-12"));
    }

    #[test]
    fn numeric_is_day_first() {
        assert_eq!(iso("03/04/1990").as_deref(), Some("1990-04-03"));
        assert_eq!(iso("12-03-1990").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("12.03.1990").as_deref(), Some("1990-03-12"));
    }

    #[test]
    fn numeric_falls_back_to_month_first() {
        assert_eq!(iso("04/25/1990").as_deref(), Some("1990-04-25"));
    }

    #[test]
    fn two_digit_years_pivot_on_today() {
        assert_eq!(iso("12/03/85").as_deref(), Some("1985-03-12"));
        assert_eq!(iso("12/03/05").as_deref(), Some("2005-03-12"));
        assert_eq!(iso("12/03/26").as_deref(), Some("2026-03-12"));
        assert_eq!(iso("12/03/27").as_deref(), Some("1927-03-12"));
    }

    #[test]
    fn textual_forms() {
        assert_eq!(iso("12 March 1990").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("12th of Mar 1990").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("1st Sept. 2001").as_deref(), Some("2001-09-01"));
        assert_eq!(iso("12-Mar-1990").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("March 12, 1990").as_deref(), Some("1990-03-12"));
        assert_eq!(iso("mar 2nd 1990").as_deref(), Some("1990-03-02"));
    }

    #[test]
    fn rejects_impossible_dates_and_noise() {
        assert_eq!(iso("1990-02-30"), None);
        assert_eq!(iso("31/31/1990"), None);
        assert_eq!(iso("12 Smarch 1990"), None);
        assert_eq!(iso("yesterday"), None);
        assert_eq!(iso(""), None);
    }
}
