//! Weekly-schedule freshness check.
//!
//! New episodes go up once a week on a fixed publication day (Thursday).
//! If the newest cached episode is older than the most recent publication
//! day, the listing page probably has something we have not seen yet.
//!
//! Comparisons are made on calendar days in the checker's time zone; the
//! time of day never matters.

use crate::dates::last_weekday;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc, Weekday};
use tracing::debug;

/// Day of the week new episodes are published.
pub const PUBLICATION_DAY: Weekday = Weekday::Thu;

/// Decides whether cached episodes are stale relative to the weekly
/// publication day.
///
/// Holds no mutable state; share it freely between tasks.
#[derive(Debug, Clone)]
pub struct FreshnessChecker<Tz: TimeZone = Local> {
    publication_day: Weekday,
    tz: Tz,
}

impl Default for FreshnessChecker<Local> {
    fn default() -> Self {
        Self::new(PUBLICATION_DAY, Local)
    }
}

impl<Tz: TimeZone> FreshnessChecker<Tz> {
    pub fn new(publication_day: Weekday, tz: Tz) -> Self {
        Self { publication_day, tz }
    }

    pub fn publication_day(&self) -> Weekday {
        self.publication_day
    }

    /// Calendar day of `now` in the checker's time zone.
    pub fn local_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// The most recent publication day on or before `now`.
    pub fn last_publication_day(&self, now: DateTime<Utc>) -> NaiveDate {
        last_weekday(self.publication_day, self.local_day(now))
    }

    /// `true` when the remote source likely has episodes newer than
    /// `latest_cached` and should be fetched.
    ///
    /// An empty cache is always stale. A cached episode published on the
    /// last publication day, or later, is fresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, latest_cached: Option<NaiveDate>) -> bool {
        let last_published = self.last_publication_day(now);
        let stale = match latest_cached {
            None => true,
            Some(cached) => cached < last_published,
        };
        debug!(
            %last_published,
            latest_cached = ?latest_cached,
            stale,
            "Computed freshness decision"
        );
        stale
    }
}

/// Free-function form of [`FreshnessChecker::needs_refresh`] using the
/// default Thursday schedule in the local time zone.
pub fn should_fetch_from_server(now: DateTime<Utc>, latest_cached: Option<NaiveDate>) -> bool {
    FreshnessChecker::default().needs_refresh(now, latest_cached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, FixedOffset};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc_midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        ymd(y, m, d).and_hms_opt(0, 0, 0).unwrap().and_utc()
    }

    fn utc_checker() -> FreshnessChecker<Utc> {
        FreshnessChecker::new(PUBLICATION_DAY, Utc)
    }

    #[test]
    fn test_last_thursday_lookback_west_of_utc() {
        // Fixture instants are UTC midnights seen from a zone five hours
        // behind, so each lands on the previous calendar day.
        let checker = FreshnessChecker::new(PUBLICATION_DAY, FixedOffset::west_opt(5 * 3600).unwrap());
        for day in 1..=14 {
            let expected = match day {
                1..=2 => ymd(2024, 12, 26),
                3..=9 => ymd(2025, 1, 2),
                _ => ymd(2025, 1, 9),
            };
            assert_eq!(
                checker.last_publication_day(utc_midnight(2025, 1, day)),
                expected,
                "2025-01-{day:02}"
            );
        }
    }

    #[test]
    fn test_last_thursday_lookback_utc() {
        let checker = utc_checker();
        for day in 1..=14 {
            let expected = match day {
                1 => ymd(2024, 12, 26),
                2..=8 => ymd(2025, 1, 2),
                _ => ymd(2025, 1, 9),
            };
            assert_eq!(
                checker.last_publication_day(utc_midnight(2025, 1, day)),
                expected,
                "2025-01-{day:02}"
            );
        }
    }

    #[test]
    fn test_time_of_day_is_ignored() {
        let checker = utc_checker();
        let thursday = ymd(2024, 11, 14);
        let late = thursday.and_hms_opt(23, 59, 59).unwrap().and_utc();
        let early = thursday.and_hms_opt(0, 0, 1).unwrap().and_utc();
        assert_eq!(checker.last_publication_day(late), thursday);
        assert_eq!(checker.last_publication_day(early), thursday);
    }

    #[test]
    fn test_cached_on_last_thursday_is_fresh() {
        let checker = utc_checker();
        let now = utc_midnight(2025, 1, 6); // Monday
        assert!(!checker.needs_refresh(now, Some(ymd(2025, 1, 2))));
    }

    #[test]
    fn test_cached_day_before_last_thursday_is_stale() {
        let checker = utc_checker();
        let now = utc_midnight(2025, 1, 6);
        assert!(checker.needs_refresh(now, Some(ymd(2025, 1, 1))));
    }

    #[test]
    fn test_cached_after_last_thursday_is_fresh() {
        let checker = utc_checker();
        let now = utc_midnight(2025, 1, 6);
        assert!(!checker.needs_refresh(now, Some(ymd(2025, 1, 4))));
        assert!(!checker.needs_refresh(now, Some(ymd(2025, 1, 6))));
    }

    #[test]
    fn test_empty_cache_is_always_stale() {
        let checker = utc_checker();
        let start = utc_midnight(2025, 1, 1);
        for offset in 0..14 {
            assert!(checker.needs_refresh(start + Days::new(offset), None));
        }
    }

    #[test]
    fn test_thursday_itself_rolls_the_window() {
        let checker = utc_checker();
        let cached = Some(ymd(2025, 1, 2));
        // Wednesday: last Thursday is the cached one.
        assert!(!checker.needs_refresh(utc_midnight(2025, 1, 8), cached));
        // Thursday: a new episode is due today.
        assert!(checker.needs_refresh(utc_midnight(2025, 1, 9), cached));
    }

    #[test]
    fn test_custom_publication_day() {
        let checker = FreshnessChecker::new(Weekday::Mon, Utc);
        assert_eq!(checker.publication_day(), Weekday::Mon);
        assert_eq!(checker.last_publication_day(utc_midnight(2025, 1, 1)), ymd(2024, 12, 30));
    }

    #[test]
    fn test_free_function_matches_empty_cache_rule() {
        assert!(should_fetch_from_server(Utc::now(), None));
    }
}
