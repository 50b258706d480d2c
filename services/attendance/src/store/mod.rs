//! Persistence seam for the attendance core
//!
//! The [`AttendanceStore`] trait is the only way core components talk
//! to the backend: typed find/insert/update/delete per entity plus a
//! subscription to the attendance-records change feed. Production uses
//! the PostgreSQL implementation; tests use the deterministic in-memory
//! one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use common::error::StoreResult;

use crate::models::{AttendanceRecord, ClubSession, MatchResult, NewAttendanceRecord, NewSession};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Identification of a deleted attendance record.
///
/// Delete events only carry ids; consumers locate the affected student
/// by matching the record id in their local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: Uuid,
    pub session_id: Uuid,
}

/// Change feed event for the attendance-records collection.
///
/// Serialized form matches the NOTIFY payload emitted by the
/// `attendance_records_notify` trigger:
/// `{"op": "insert" | "update" | "delete", "record": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "record", rename_all = "snake_case")]
pub enum ChangeEvent {
    Insert(AttendanceRecord),
    Update(AttendanceRecord),
    Delete(DeletedRecord),
}

impl ChangeEvent {
    /// Session the event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => record.session_id,
            ChangeEvent::Delete(deleted) => deleted.session_id,
        }
    }
}

/// Persistence operations required by the attendance core.
///
/// Implementations must enforce two uniqueness constraints: at most one
/// non-cancelled session per date, and at most one attendance record
/// per (session, student) pair. Violations surface as
/// [`common::error::StoreError::Constraint`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Look up the non-cancelled session for a calendar date.
    async fn find_session_by_date(&self, date: NaiveDate) -> StoreResult<Option<ClubSession>>;

    /// Insert a session; rejected with `Constraint` when a non-cancelled
    /// session already exists for the date.
    async fn insert_session(&self, new_session: &NewSession) -> StoreResult<ClubSession>;

    /// Look up the attendance record for one (session, student) pair.
    async fn find_record(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// All attendance records for a session.
    async fn list_records(&self, session_id: Uuid) -> StoreResult<Vec<AttendanceRecord>>;

    /// Insert a record; rejected with `Constraint` when the
    /// (session, student) pair already has one.
    async fn insert_record(
        &self,
        new_record: &NewAttendanceRecord,
    ) -> StoreResult<AttendanceRecord>;

    /// Set the check-out timestamp on an existing record.
    async fn set_check_out(
        &self,
        record_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord>;

    /// Delete a record outright (check-in toggle-off).
    async fn delete_record(&self, record_id: Uuid) -> StoreResult<()>;

    /// All recorded tournament matches, oldest first.
    async fn list_match_results(&self) -> StoreResult<Vec<MatchResult>>;

    /// Subscribe to the attendance-records change feed. Every mutation,
    /// local or remote, is eventually echoed here.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Observable health of the change feed transport. While the value
    /// is `false` no events are being delivered; a flip back to `true`
    /// means events may have been missed in between and consumers must
    /// resynchronize from persisted state.
    fn feed_health(&self) -> watch::Receiver<bool>;
}
