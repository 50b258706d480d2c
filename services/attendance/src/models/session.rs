//! Club session model and related functionality

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One calendar occurrence of the club meeting.
///
/// At most one non-cancelled session exists per calendar date; the
/// persistence layer enforces this with a partial unique index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClubSession {
    pub id: Uuid,
    /// Calendar date in the club's civil timezone, no time component
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub cancelled: bool,
    /// Timezone identifier the date was computed in
    pub timezone: String,
}

/// New session creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
}
