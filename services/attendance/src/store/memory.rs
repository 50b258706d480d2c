//! Deterministic in-memory attendance store
//!
//! Enforces the same uniqueness constraints as the SQL schema and
//! echoes every mutation to subscribers the way the PostgreSQL trigger
//! does. Supports one-shot failure injection so tests can exercise the
//! abort-and-resync semantics without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use common::error::{StoreError, StoreResult};

use crate::models::{
    AttendanceRecord, ClubSession, MatchResult, NewAttendanceRecord, NewSession, Student,
};
use crate::roster::RosterProvider;
use crate::store::{AttendanceStore, ChangeEvent, DeletedRecord};

#[derive(Default)]
struct Inner {
    students: Vec<Student>,
    sessions: Vec<ClubSession>,
    records: Vec<AttendanceRecord>,
    matches: Vec<MatchResult>,
    fail_next: Option<StoreError>,
}

/// In-memory store for tests and local development
pub struct MemoryStore {
    inner: Mutex<Inner>,
    events: broadcast::Sender<ChangeEvent>,
    feed_health: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        let (feed_health, _) = watch::channel(true);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
            feed_health,
        }
    }

    /// Simulate the change feed transport going down or coming back.
    ///
    /// While down, mutations still persist but are not echoed to
    /// subscribers, matching a lost LISTEN connection.
    pub fn set_feed_health(&self, up: bool) {
        self.feed_health.send_replace(up);
    }

    /// Seed a roster student.
    pub fn add_student(&self, student: Student) {
        self.lock().students.push(student);
    }

    /// Seed a played match.
    pub fn add_match_result(&self, result: MatchResult) {
        self.lock().matches.push(result);
    }

    /// Make the next store operation fail with the given error.
    pub fn fail_next_operation(&self, error: StoreError) {
        self.lock().fail_next = Some(error);
    }

    /// Number of attendance records currently held, across sessions.
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    fn emit(&self, event: ChangeEvent) {
        if !*self.feed_health.borrow() {
            return;
        }
        // send only fails with no subscribers, which is fine
        let _ = self.events.send(event);
    }
}

fn take_injected_failure(inner: &mut Inner) -> StoreResult<()> {
    match inner.fail_next.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_session_by_date(&self, date: NaiveDate) -> StoreResult<Option<ClubSession>> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        Ok(inner
            .sessions
            .iter()
            .find(|s| s.session_date == date && !s.cancelled)
            .cloned())
    }

    async fn insert_session(&self, new_session: &NewSession) -> StoreResult<ClubSession> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        if inner
            .sessions
            .iter()
            .any(|s| s.session_date == new_session.session_date && !s.cancelled)
        {
            return Err(StoreError::Constraint(format!(
                "session already exists for {}",
                new_session.session_date
            )));
        }

        let session = ClubSession {
            id: Uuid::new_v4(),
            session_date: new_session.session_date,
            start_time: new_session.start_time,
            end_time: new_session.end_time,
            cancelled: false,
            timezone: new_session.timezone.clone(),
        };
        inner.sessions.push(session.clone());

        Ok(session)
    }

    async fn find_record(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        Ok(inner
            .records
            .iter()
            .find(|r| r.session_id == session_id && r.student_id == student_id)
            .cloned())
    }

    async fn list_records(&self, session_id: Uuid) -> StoreResult<Vec<AttendanceRecord>> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        Ok(inner
            .records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn insert_record(
        &self,
        new_record: &NewAttendanceRecord,
    ) -> StoreResult<AttendanceRecord> {
        let record = {
            let mut inner = self.lock();
            take_injected_failure(&mut inner)?;

            if inner.records.iter().any(|r| {
                r.session_id == new_record.session_id && r.student_id == new_record.student_id
            }) {
                return Err(StoreError::Constraint(format!(
                    "student {} already has a record for session {}",
                    new_record.student_id, new_record.session_id
                )));
            }

            let record = AttendanceRecord {
                id: Uuid::new_v4(),
                session_id: new_record.session_id,
                student_id: new_record.student_id,
                check_in_at: new_record.check_in_at,
                check_out_at: None,
            };
            inner.records.push(record.clone());
            record
        };

        self.emit(ChangeEvent::Insert(record.clone()));
        Ok(record)
    }

    async fn set_check_out(
        &self,
        record_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        let record = {
            let mut inner = self.lock();
            take_injected_failure(&mut inner)?;

            let record = inner
                .records
                .iter_mut()
                .find(|r| r.id == record_id)
                .ok_or_else(|| {
                    StoreError::InvalidState(format!(
                        "attendance record {} no longer exists",
                        record_id
                    ))
                })?;
            record.check_out_at = Some(at);
            record.clone()
        };

        self.emit(ChangeEvent::Update(record.clone()));
        Ok(record)
    }

    async fn delete_record(&self, record_id: Uuid) -> StoreResult<()> {
        let deleted = {
            let mut inner = self.lock();
            take_injected_failure(&mut inner)?;

            let position = inner.records.iter().position(|r| r.id == record_id);
            position.map(|i| inner.records.remove(i))
        };

        if let Some(record) = deleted {
            self.emit(ChangeEvent::Delete(DeletedRecord {
                id: record.id,
                session_id: record.session_id,
            }));
        }

        Ok(())
    }

    async fn list_match_results(&self) -> StoreResult<Vec<MatchResult>> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        let mut matches = inner.matches.clone();
        matches.sort_by_key(|m| m.played_at);
        Ok(matches)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    fn feed_health(&self) -> watch::Receiver<bool> {
        self.feed_health.subscribe()
    }
}

#[async_trait]
impl RosterProvider for MemoryStore {
    async fn list_active_students(&self) -> StoreResult<Vec<Student>> {
        let mut inner = self.lock();
        take_injected_failure(&mut inner)?;

        let mut students: Vec<Student> =
            inner.students.iter().filter(|s| s.active).cloned().collect();
        students.sort_by(|a, b| {
            a.grade
                .cmp(&b.grade)
                .then_with(|| a.last_name.cmp(&b.last_name))
        });
        Ok(students)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn new_session_for(date: NaiveDate) -> NewSession {
        NewSession {
            session_date: date,
            start_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
            timezone: "America/Chicago".to_string(),
        }
    }

    #[test]
    fn duplicate_session_insert_is_rejected() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();

            store.insert_session(&new_session_for(date)).await.unwrap();
            let err = store.insert_session(&new_session_for(date)).await.unwrap_err();
            assert!(matches!(err, StoreError::Constraint(_)));
        });
    }

    #[test]
    fn duplicate_record_insert_is_rejected() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
            let session = store.insert_session(&new_session_for(date)).await.unwrap();

            let new_record = NewAttendanceRecord {
                session_id: session.id,
                student_id: Uuid::new_v4(),
                check_in_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 30, 0).unwrap(),
            };
            store.insert_record(&new_record).await.unwrap();
            let err = store.insert_record(&new_record).await.unwrap_err();
            assert!(matches!(err, StoreError::Constraint(_)));
        });
    }

    #[test]
    fn mutations_are_echoed_to_subscribers() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let mut feed = store.subscribe();
            let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
            let session = store.insert_session(&new_session_for(date)).await.unwrap();

            let record = store
                .insert_record(&NewAttendanceRecord {
                    session_id: session.id,
                    student_id: Uuid::new_v4(),
                    check_in_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 30, 0).unwrap(),
                })
                .await
                .unwrap();
            store.delete_record(record.id).await.unwrap();

            assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Insert(record.clone()));
            assert_eq!(
                feed.recv().await.unwrap(),
                ChangeEvent::Delete(DeletedRecord {
                    id: record.id,
                    session_id: session.id,
                })
            );
        });
    }

    #[test]
    fn mutations_are_not_echoed_while_the_feed_is_down() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let mut feed = store.subscribe();
            let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
            let session = store.insert_session(&new_session_for(date)).await.unwrap();

            store.set_feed_health(false);
            let silent = store
                .insert_record(&NewAttendanceRecord {
                    session_id: session.id,
                    student_id: Uuid::new_v4(),
                    check_in_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 30, 0).unwrap(),
                })
                .await
                .unwrap();

            store.set_feed_health(true);
            let echoed = store
                .insert_record(&NewAttendanceRecord {
                    session_id: session.id,
                    student_id: Uuid::new_v4(),
                    check_in_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 31, 0).unwrap(),
                })
                .await
                .unwrap();

            // both persisted, but only the second reached the feed
            assert_eq!(store.record_count(), 2);
            assert_ne!(silent.id, echoed.id);
            assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Insert(echoed));
        });
    }

    #[test]
    fn injected_failure_fires_once() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.fail_next_operation(StoreError::Connectivity("backend offline".to_string()));

            let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
            let err = store.find_session_by_date(date).await.unwrap_err();
            assert!(matches!(err, StoreError::Connectivity(_)));

            assert!(store.find_session_by_date(date).await.unwrap().is_none());
        });
    }
}
