//! PostgreSQL-backed attendance store
//!
//! Queries follow the schema in `migrations/0001_init.sql`. The change
//! feed is driven by the `attendance_records_notify` trigger: a LISTEN
//! task forwards its JSON payloads into the broadcast channel that
//! `subscribe` hands out, so local writes come back as echoes the same
//! way remote ones do.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use common::error::{StoreError, StoreResult};

use crate::models::{
    AttendanceRecord, ClubSession, MatchOutcome, MatchResult, NewAttendanceRecord, NewSession,
    Student,
};
use crate::roster::RosterProvider;
use crate::store::{AttendanceStore, ChangeEvent};

const CHANGE_CHANNEL: &str = "attendance_records";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    events: broadcast::Sender<ChangeEvent>,
    feed_health: watch::Sender<bool>,
}

impl PgStore {
    /// Create a new store over an existing connection pool.
    ///
    /// The change feed starts unhealthy; `spawn_change_listener` flips
    /// it to healthy once the LISTEN connection is established.
    pub fn new(pool: PgPool) -> Self {
        let (events, _) = broadcast::channel(256);
        let (feed_health, _) = watch::channel(false);
        Self {
            pool,
            events,
            feed_health,
        }
    }

    /// Spawn the LISTEN task that forwards trigger notifications into
    /// the change feed. Reconnects with a delay after connection loss,
    /// publishing each up/down transition on the feed-health channel so
    /// consumers can pause their liveness flag and resynchronize once
    /// the transport comes back.
    pub fn spawn_change_listener(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let events = self.events.clone();
        let feed_health = self.feed_health.clone();

        tokio::spawn(async move {
            loop {
                match PgListener::connect_with(&pool).await {
                    Ok(mut listener) => match listener.listen(CHANGE_CHANNEL).await {
                        Ok(()) => {
                            info!("Listening for attendance record changes");
                            feed_health.send_replace(true);
                            loop {
                                match listener.recv().await {
                                    Ok(notification) => {
                                        forward_notification(&events, notification.payload());
                                    }
                                    Err(e) => {
                                        warn!("Change feed connection lost: {}", e);
                                        feed_health.send_replace(false);
                                        break;
                                    }
                                }
                            }
                        }
                        Err(e) => warn!("Failed to LISTEN on {}: {}", CHANGE_CHANNEL, e),
                    },
                    Err(e) => warn!("Failed to connect change feed listener: {}", e),
                }

                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }
}

fn forward_notification(events: &broadcast::Sender<ChangeEvent>, payload: &str) {
    match serde_json::from_str::<ChangeEvent>(payload) {
        // send only fails with no subscribers, which is fine
        Ok(event) => {
            let _ = events.send(event);
        }
        Err(e) => warn!("Ignoring malformed change payload: {}", e),
    }
}

/// Map a sqlx error onto the store taxonomy. Unique-violation
/// (SQLSTATE 23505) becomes `Constraint`; everything else is treated as
/// a connectivity failure the caller may retry.
fn map_sqlx_error(context: &str, error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Constraint(format!("{}: {}", context, db.message()))
        }
        _ => StoreError::Connectivity(format!("{}: {}", context, error)),
    }
}

fn session_from_row(row: &sqlx::postgres::PgRow) -> ClubSession {
    ClubSession {
        id: row.get("id"),
        session_date: row.get("session_date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        cancelled: row.get("cancelled"),
        timezone: row.get("timezone"),
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> AttendanceRecord {
    AttendanceRecord {
        id: row.get("id"),
        session_id: row.get("session_id"),
        student_id: row.get("student_id"),
        check_in_at: row.get("check_in_at"),
        check_out_at: row.get("check_out_at"),
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn find_session_by_date(&self, date: NaiveDate) -> StoreResult<Option<ClubSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, session_date, start_time, end_time, cancelled, timezone
            FROM club_sessions
            WHERE session_date = $1 AND NOT cancelled
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find session by date", e))?;

        Ok(row.as_ref().map(session_from_row))
    }

    async fn insert_session(&self, new_session: &NewSession) -> StoreResult<ClubSession> {
        info!("Creating session for {}", new_session.session_date);

        let row = sqlx::query(
            r#"
            INSERT INTO club_sessions (session_date, start_time, end_time, cancelled, timezone)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING id, session_date, start_time, end_time, cancelled, timezone
            "#,
        )
        .bind(new_session.session_date)
        .bind(new_session.start_time)
        .bind(new_session.end_time)
        .bind(&new_session.timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert session", e))?;

        Ok(session_from_row(&row))
    }

    async fn find_record(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, session_id, student_id, check_in_at, check_out_at
            FROM attendance_records
            WHERE session_id = $1 AND student_id = $2
            "#,
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find attendance record", e))?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn list_records(&self, session_id: Uuid) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, student_id, check_in_at, check_out_at
            FROM attendance_records
            WHERE session_id = $1
            ORDER BY check_in_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list attendance records", e))?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn insert_record(
        &self,
        new_record: &NewAttendanceRecord,
    ) -> StoreResult<AttendanceRecord> {
        info!(
            "Checking in student {} for session {}",
            new_record.student_id, new_record.session_id
        );

        let row = sqlx::query(
            r#"
            INSERT INTO attendance_records (session_id, student_id, check_in_at)
            VALUES ($1, $2, $3)
            RETURNING id, session_id, student_id, check_in_at, check_out_at
            "#,
        )
        .bind(new_record.session_id)
        .bind(new_record.student_id)
        .bind(new_record.check_in_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert attendance record", e))?;

        Ok(record_from_row(&row))
    }

    async fn set_check_out(
        &self,
        record_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        info!("Checking out record {}", record_id);

        let row = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_at = $2
            WHERE id = $1
            RETURNING id, session_id, student_id, check_in_at, check_out_at
            "#,
        )
        .bind(record_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set check-out", e))?;

        match row {
            Some(row) => Ok(record_from_row(&row)),
            None => Err(StoreError::InvalidState(format!(
                "attendance record {} no longer exists",
                record_id
            ))),
        }
    }

    async fn delete_record(&self, record_id: Uuid) -> StoreResult<()> {
        info!("Deleting record {}", record_id);

        let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete attendance record", e))?;

        if result.rows_affected() == 0 {
            warn!("Record {} was already gone", record_id);
        }

        Ok(())
    }

    async fn list_match_results(&self) -> StoreResult<Vec<MatchResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, white_id, black_id, outcome, played_at
            FROM match_results
            ORDER BY played_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list match results", e))?;

        rows.iter()
            .map(|row| {
                let outcome: String = row.get("outcome");
                let outcome = MatchOutcome::from_str(&outcome)
                    .map_err(StoreError::InvalidState)?;
                Ok(MatchResult {
                    id: row.get("id"),
                    white_id: row.get("white_id"),
                    black_id: row.get("black_id"),
                    outcome,
                    played_at: row.get("played_at"),
                })
            })
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    fn feed_health(&self) -> watch::Receiver<bool> {
        self.feed_health.subscribe()
    }
}

#[async_trait]
impl RosterProvider for PgStore {
    async fn list_active_students(&self) -> StoreResult<Vec<Student>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, grade, teacher_name, active,
                   created_at, updated_at
            FROM students
            WHERE active
            ORDER BY grade, last_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list active students", e))?;

        Ok(rows
            .into_iter()
            .map(|row| Student {
                id: row.get("id"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                grade: row.get("grade"),
                teacher_name: row.get("teacher_name"),
                active: row.get("active"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }
}
