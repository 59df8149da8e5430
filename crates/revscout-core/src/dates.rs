//! Normalization of heterogeneous review-date strings.
//!
//! Listing pages emit dates as display text (`"January 5, 2023"`,
//! `"2 weeks ago"`), machine-readable attribute values
//! (`"2023-01-05T08:30:00Z"`), or partial dates (`"March 2023"`). Everything
//! funnels through [`normalize_date`], which either resolves to a calendar
//! date or gives up with `None` — an unresolvable date is a normal outcome
//! for a record, never an error.

use std::sync::OnceLock;

use chrono::{DateTime, Days, NaiveDate};
use regex::Regex;

/// Absolute display formats, tried in order. Ordering is load-bearing:
/// `%m/%d/%Y` outranks `%d/%m/%Y`, so an ambiguous numeric date like
/// `03/04/2023` always resolves month-first.
const ABSOLUTE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
];

/// Month-year partials have no day component; they are parsed with a day of
/// `1` prepended.
const MONTH_YEAR_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

/// Years outside this window in a bare-number string are review counts or
/// vote totals, not dates.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1990..=2100;

/// Resolves a site-supplied date string to a calendar date.
///
/// Tries absolute formats first, then relative expressions (`"3 days ago"`,
/// `"yesterday"`, `"today"`) resolved against `today` — a caller-supplied
/// reference date, never the wall clock, so results are reproducible.
/// Relative months count as 30 days and years as 365; listing pages round
/// these expressions anyway, so calendar-exact arithmetic is not attempted.
#[must_use]
pub fn normalize_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_absolute(text).or_else(|| parse_relative(text, today))
}

/// Returns `true` when `date` lies in the closed interval `[start, end]`.
#[must_use]
pub fn within_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}

fn parse_absolute(text: &str) -> Option<NaiveDate> {
    // Machine-readable attribute values carry a time component.
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }

    for format in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    let with_day = format!("1 {text}");
    for format in MONTH_YEAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, format) {
            return Some(date);
        }
    }

    if let Ok(year) = text.parse::<i32>() {
        if YEAR_RANGE.contains(&year) {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }

    None
}

fn relative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\s*(day|week|month|year)s?\s+ago").expect("valid relative-date regex")
    })
}

fn parse_relative(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();

    if lower.contains("yesterday") {
        return today.checked_sub_days(Days::new(1));
    }
    if lower.contains("today") {
        return Some(today);
    }

    let captures = relative_regex().captures(&lower)?;
    let count: u64 = captures[1].parse().ok()?;
    let days = match &captures[2] {
        "day" => count,
        "week" => count.checked_mul(7)?,
        "month" => count.checked_mul(30)?,
        "year" => count.checked_mul(365)?,
        _ => return None,
    };
    today.checked_sub_days(Days::new(days))
}
