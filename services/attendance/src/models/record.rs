//! Attendance record model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Links one student to one session.
///
/// A record only comes into existence on check-in, so `check_in_at` is
/// always set; `check_out_at` is set later or never. At most one record
/// exists per (session, student) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: Option<DateTime<Utc>>,
}

/// New attendance record creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendanceRecord {
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub check_in_at: DateTime<Utc>,
}
