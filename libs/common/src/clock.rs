//! Clock and club-day calendar
//!
//! All time handling in the attendance core goes through an injected
//! [`Clock`] plus a [`ClubCalendar`] that owns the civil-timezone
//! arithmetic, so components stay deterministic under test and no call
//! site does its own timezone conversion.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};

/// Source of "now" for core components.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Civil-time calendar for the club's fixed timezone and meeting weekday.
///
/// All three queries are pure functions of the given instant; the
/// calendar itself never reads the wall clock.
#[derive(Debug, Clone)]
pub struct ClubCalendar {
    offset: FixedOffset,
    timezone_name: String,
    club_weekday: Weekday,
}

impl ClubCalendar {
    pub fn new(offset: FixedOffset, timezone_name: impl Into<String>, club_weekday: Weekday) -> Self {
        Self {
            offset,
            timezone_name: timezone_name.into(),
            club_weekday,
        }
    }

    /// The identifier persisted onto sessions created for this calendar.
    pub fn timezone_name(&self) -> &str {
        &self.timezone_name
    }

    pub fn club_weekday(&self) -> Weekday {
        self.club_weekday
    }

    /// The calendar date of `instant` in the club's timezone.
    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Whether `instant` falls on the club's meeting weekday.
    pub fn is_club_day(&self, instant: DateTime<Utc>) -> bool {
        self.civil_date(instant).weekday() == self.club_weekday
    }

    /// The current-or-upcoming club date: the same civil date when
    /// `instant` is already on the club weekday, otherwise the next
    /// occurrence (1-6 days ahead).
    pub fn club_date_for(&self, instant: DateTime<Utc>) -> NaiveDate {
        let today = self.civil_date(instant);
        today + Duration::days(self.days_until_club_day(today))
    }

    /// The strictly-future club date: 1-7 days ahead, never the same day.
    pub fn next_club_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        let today = self.civil_date(instant);
        let ahead = self.days_until_club_day(today + Duration::days(1)) + 1;
        today + Duration::days(ahead)
    }

    fn days_until_club_day(&self, from: NaiveDate) -> i64 {
        let current = i64::from(from.weekday().num_days_from_monday());
        let target = i64::from(self.club_weekday.num_days_from_monday());
        (target - current).rem_euclid(7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn calendar() -> ClubCalendar {
        // UTC-6, Wednesday club day
        let offset = FixedOffset::west_opt(6 * 3600).unwrap();
        ClubCalendar::new(offset, "America/Chicago", Weekday::Wed)
    }

    fn instant(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn monday_resolves_to_wednesday_two_days_later() {
        // 2026-03-02 is a Monday
        let cal = calendar();
        let date = cal.club_date_for(instant(2026, 3, 2, 18));
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }

    #[test]
    fn wednesday_resolves_to_same_date() {
        let cal = calendar();
        let noon_civil = instant(2026, 3, 4, 18);
        assert!(cal.is_club_day(noon_civil));
        assert_eq!(
            cal.club_date_for(noon_civil),
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
        );
    }

    #[test]
    fn next_club_day_is_strictly_future() {
        let cal = calendar();
        // On a Wednesday the next club day is a full week out.
        assert_eq!(
            cal.next_club_day(instant(2026, 3, 4, 18)),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
        );
        // Thursday rolls to the following Wednesday, six days ahead.
        assert_eq!(
            cal.next_club_day(instant(2026, 3, 5, 18)),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
        );
    }

    #[test]
    fn civil_date_respects_offset_across_midnight() {
        let cal = calendar();
        // 03:00 UTC Thursday is still Wednesday evening at UTC-6.
        let late_evening = instant(2026, 3, 5, 3);
        assert!(cal.is_club_day(late_evening));
        assert_eq!(
            cal.club_date_for(late_evening),
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
        );
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at(instant(2026, 3, 2, 12));
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), instant(2026, 3, 2, 14));
    }
}
