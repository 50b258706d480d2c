//! Club configuration
//!
//! Settings for the club's meeting schedule, read from the environment
//! with sensible defaults.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, NaiveTime, Weekday};

use crate::clock::ClubCalendar;

/// Configuration for the club's meeting schedule and timezone
#[derive(Debug, Clone)]
pub struct ClubConfig {
    /// Weekday the club meets on
    pub club_weekday: Weekday,
    /// Fixed UTC offset of the club's civil timezone
    pub utc_offset: FixedOffset,
    /// Timezone identifier persisted onto sessions
    pub timezone_name: String,
    /// Default session start time-of-day
    pub session_start: NaiveTime,
    /// Default session end time-of-day
    pub session_end: NaiveTime,
}

impl ClubConfig {
    /// Create a new ClubConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CLUB_WEEKDAY`: meeting weekday (default: "wednesday")
    /// - `CLUB_UTC_OFFSET`: civil timezone offset (default: "-06:00")
    /// - `CLUB_TIMEZONE`: timezone identifier (default: "America/Chicago")
    /// - `CLUB_SESSION_START`: start time-of-day, %H:%M (default: "15:30")
    /// - `CLUB_SESSION_END`: end time-of-day, %H:%M (default: "16:30")
    pub fn from_env() -> Result<Self> {
        let club_weekday = env::var("CLUB_WEEKDAY").unwrap_or_else(|_| "wednesday".to_string());
        let club_weekday = Weekday::from_str(&club_weekday)
            .ok()
            .with_context(|| format!("Invalid CLUB_WEEKDAY: {}", club_weekday))?;

        let utc_offset = env::var("CLUB_UTC_OFFSET").unwrap_or_else(|_| "-06:00".to_string());
        let utc_offset = FixedOffset::from_str(&utc_offset)
            .ok()
            .with_context(|| format!("Invalid CLUB_UTC_OFFSET: {}", utc_offset))?;

        let timezone_name =
            env::var("CLUB_TIMEZONE").unwrap_or_else(|_| "America/Chicago".to_string());

        let session_start = parse_time_var("CLUB_SESSION_START", "15:30")?;
        let session_end = parse_time_var("CLUB_SESSION_END", "16:30")?;

        if session_end <= session_start {
            bail!(
                "CLUB_SESSION_END ({}) must be after CLUB_SESSION_START ({})",
                session_end,
                session_start
            );
        }

        Ok(Self {
            club_weekday,
            utc_offset,
            timezone_name,
            session_start,
            session_end,
        })
    }

    /// Build the calendar used by the attendance core.
    pub fn calendar(&self) -> ClubCalendar {
        ClubCalendar::new(self.utc_offset, self.timezone_name.clone(), self.club_weekday)
    }
}

fn parse_time_var(name: &str, default: &str) -> Result<NaiveTime> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&value, "%H:%M")
        .with_context(|| format!("Invalid {}: {}", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_club_env() {
        for name in [
            "CLUB_WEEKDAY",
            "CLUB_UTC_OFFSET",
            "CLUB_TIMEZONE",
            "CLUB_SESSION_START",
            "CLUB_SESSION_END",
        ] {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_club_config_defaults() {
        clear_club_env();

        let config = ClubConfig::from_env().expect("Failed to create club config");
        assert_eq!(config.club_weekday, Weekday::Wed);
        assert_eq!(config.timezone_name, "America/Chicago");
        assert_eq!(
            config.session_start,
            NaiveTime::from_hms_opt(15, 30, 0).unwrap()
        );
        assert_eq!(
            config.session_end,
            NaiveTime::from_hms_opt(16, 30, 0).unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_club_config_overrides() {
        clear_club_env();
        unsafe {
            env::set_var("CLUB_WEEKDAY", "thursday");
            env::set_var("CLUB_SESSION_START", "16:00");
            env::set_var("CLUB_SESSION_END", "17:15");
        }

        let config = ClubConfig::from_env().expect("Failed to create club config");
        assert_eq!(config.club_weekday, Weekday::Thu);
        assert_eq!(
            config.session_end,
            NaiveTime::from_hms_opt(17, 15, 0).unwrap()
        );

        clear_club_env();
    }

    #[test]
    #[serial]
    fn test_club_config_rejects_inverted_times() {
        clear_club_env();
        unsafe {
            env::set_var("CLUB_SESSION_START", "16:30");
            env::set_var("CLUB_SESSION_END", "15:30");
        }

        assert!(ClubConfig::from_env().is_err());

        clear_club_env();
    }
}
