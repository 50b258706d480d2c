//! In-memory attendance projection
//!
//! `AttendanceView` is a read-optimized map of the active session's
//! records, never the source of truth. Both the reconciler's confirmed
//! outcomes and remote realtime events flow through the same
//! [`AttendanceView::apply`] transition, which keeps the two paths
//! convergent and makes echoes harmless.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::AttendanceRecord;
use crate::store::ChangeEvent;

/// Per-student attendance state for the active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceEntry {
    pub checked_in: bool,
    pub checked_out: bool,
    pub record_id: Option<Uuid>,
}

impl From<&AttendanceRecord> for AttendanceEntry {
    fn from(record: &AttendanceRecord) -> Self {
        // a record exists only after a check-in
        Self {
            checked_in: true,
            checked_out: record.check_out_at.is_some(),
            record_id: Some(record.id),
        }
    }
}

/// Derived attendance map for one session, keyed by student id
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    session_id: Uuid,
    entries: HashMap<Uuid, AttendanceEntry>,
}

impl AttendanceView {
    /// Empty view for a session.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            entries: HashMap::new(),
        }
    }

    /// Rebuild the full view from persisted records (resync).
    pub fn from_records(session_id: Uuid, records: &[AttendanceRecord]) -> Self {
        let entries = records
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| (r.student_id, AttendanceEntry::from(r)))
            .collect();
        Self {
            session_id,
            entries,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn entry(&self, student_id: Uuid) -> Option<AttendanceEntry> {
        self.entries.get(&student_id).copied()
    }

    pub fn entries(&self) -> &HashMap<Uuid, AttendanceEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one change event into the view.
    ///
    /// This is the single state-transition function for local outcomes
    /// and remote events alike. It is idempotent: replaying an event
    /// (the realtime echo of a local write) leaves the view unchanged.
    /// Events for other sessions are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => {
                if record.session_id == self.session_id {
                    self.entries
                        .insert(record.student_id, AttendanceEntry::from(record));
                }
            }
            ChangeEvent::Delete(deleted) => {
                self.entries
                    .retain(|_, entry| entry.record_id != Some(deleted.id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DeletedRecord;
    use chrono::{TimeZone, Utc};

    fn record(session_id: Uuid, student_id: Uuid) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            session_id,
            student_id,
            check_in_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 32, 0).unwrap(),
            check_out_at: None,
        }
    }

    #[test]
    fn insert_then_update_marks_check_out() {
        let session_id = Uuid::new_v4();
        let student_id = Uuid::new_v4();
        let mut view = AttendanceView::new(session_id);

        let mut rec = record(session_id, student_id);
        view.apply(&ChangeEvent::Insert(rec.clone()));
        assert_eq!(
            view.entry(student_id),
            Some(AttendanceEntry {
                checked_in: true,
                checked_out: false,
                record_id: Some(rec.id),
            })
        );

        rec.check_out_at = Some(Utc.with_ymd_and_hms(2026, 3, 4, 22, 25, 0).unwrap());
        view.apply(&ChangeEvent::Update(rec.clone()));
        assert_eq!(
            view.entry(student_id),
            Some(AttendanceEntry {
                checked_in: true,
                checked_out: true,
                record_id: Some(rec.id),
            })
        );
    }

    #[test]
    fn applying_the_same_event_twice_is_a_no_op() {
        let session_id = Uuid::new_v4();
        let student_id = Uuid::new_v4();
        let mut view = AttendanceView::new(session_id);

        let event = ChangeEvent::Insert(record(session_id, student_id));
        view.apply(&event);
        let after_once = view.entries().clone();

        view.apply(&event);
        assert_eq!(view.entries(), &after_once);

        let delete = ChangeEvent::Delete(DeletedRecord {
            id: view.entry(student_id).unwrap().record_id.unwrap(),
            session_id,
        });
        view.apply(&delete);
        assert!(view.entry(student_id).is_none());

        view.apply(&delete);
        assert!(view.is_empty());
    }

    #[test]
    fn delete_removes_the_matching_student() {
        let session_id = Uuid::new_v4();
        let s_kept = Uuid::new_v4();
        let s_removed = Uuid::new_v4();
        let mut view = AttendanceView::new(session_id);

        view.apply(&ChangeEvent::Insert(record(session_id, s_kept)));
        let removed_record = record(session_id, s_removed);
        view.apply(&ChangeEvent::Insert(removed_record.clone()));

        view.apply(&ChangeEvent::Delete(DeletedRecord {
            id: removed_record.id,
            session_id,
        }));

        assert!(view.entry(s_removed).is_none());
        assert!(view.entry(s_kept).is_some());
    }

    #[test]
    fn events_for_other_sessions_are_ignored() {
        let session_id = Uuid::new_v4();
        let mut view = AttendanceView::new(session_id);

        view.apply(&ChangeEvent::Insert(record(Uuid::new_v4(), Uuid::new_v4())));
        assert!(view.is_empty());
    }
}
