//! Calendar helpers shared by the extractor and the freshness check.
//!
//! Weekdays are numbered 1..=7 starting from Sunday, so Thursday is 5.

use crate::utils::collapse_whitespace;
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Format of the date fragment in an episode header, e.g. `14 Nov 2024`.
///
/// chrono only knows English month abbreviations, so parsing does not
/// depend on the host locale.
pub const EPISODE_DATE_FORMAT: &str = "%d %b %Y";

/// Sunday-first weekday number (Sunday = 1, Saturday = 7).
pub fn sunday_number(weekday: Weekday) -> u32 {
    weekday.number_from_sunday()
}

/// Inverse of [`sunday_number`]. Returns `None` outside 1..=7.
pub fn weekday_from_sunday_number(n: u32) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Sun),
        2 => Some(Weekday::Mon),
        3 => Some(Weekday::Tue),
        4 => Some(Weekday::Wed),
        5 => Some(Weekday::Thu),
        6 => Some(Weekday::Fri),
        7 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Most recent `target` weekday on or before `from`.
///
/// If `from` already falls on `target` the same day is returned, never the
/// one a week earlier.
pub fn last_weekday(target: Weekday, from: NaiveDate) -> NaiveDate {
    let mut diff = sunday_number(target) as i64 - sunday_number(from.weekday()) as i64;
    if diff > 0 {
        diff -= 7;
    }
    // diff is in -6..=0
    from.checked_sub_days(Days::new(diff.unsigned_abs()))
        .unwrap_or(from)
}

/// Parse the publication date out of an episode header.
///
/// The header reads like `Episode 241114 / 14 Nov 2024`. The id fragment is
/// removed first, then every `/`, and what is left is parsed with
/// [`EPISODE_DATE_FORMAT`]. Anything unparseable yields `None`.
pub fn parse_episode_date(header: &str, id: Option<&str>) -> Option<NaiveDate> {
    let header = collapse_whitespace(header);
    let without_id = match id {
        Some(id) if !id.is_empty() => header.replace(id, ""),
        _ => header,
    };
    let cleaned = collapse_whitespace(&without_id.replace('/', ""));
    if cleaned.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(&cleaned, EPISODE_DATE_FORMAT).ok()
}
