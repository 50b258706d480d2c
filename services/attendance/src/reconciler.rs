//! Attendance reconciler
//!
//! Turns check-in/check-out intents into persisted record mutations.
//! The reconciler never touches local state itself: it returns a
//! confirmed [`CheckOutcome`] that the caller folds into the view, so
//! nothing is mutated optimistically before the write succeeds.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use common::clock::Clock;
use common::error::{StoreError, StoreResult};

use crate::models::{ClubSession, NewAttendanceRecord};
use crate::store::{AttendanceStore, ChangeEvent, DeletedRecord};

/// Confirmed result of a check-in or check-out operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CheckOutcome {
    /// Check-in toggle-off: the student's existing record was deleted.
    Removed {
        student_id: Uuid,
        record_id: Uuid,
        session_id: Uuid,
    },
    CheckedIn {
        record: crate::models::AttendanceRecord,
    },
    CheckedOut {
        record: crate::models::AttendanceRecord,
    },
}

impl CheckOutcome {
    /// The change event this outcome corresponds to, so the caller can
    /// fold it through the same transition the realtime path uses.
    pub fn as_change_event(&self) -> ChangeEvent {
        match self {
            CheckOutcome::Removed {
                record_id,
                session_id,
                ..
            } => ChangeEvent::Delete(DeletedRecord {
                id: *record_id,
                session_id: *session_id,
            }),
            CheckOutcome::CheckedIn { record } => ChangeEvent::Insert(record.clone()),
            CheckOutcome::CheckedOut { record } => ChangeEvent::Update(record.clone()),
        }
    }
}

/// Reconciles check-in/check-out intents against the store
pub struct AttendanceReconciler {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
}

impl AttendanceReconciler {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Toggle a student's check-in for the session.
    ///
    /// No existing record: create one stamped with the current instant.
    /// Existing record: delete it outright and report `Removed`. The
    /// toggle-to-delete behavior discards the original arrival time;
    /// see DESIGN.md before treating that as permanent semantics.
    pub async fn check_in(
        &self,
        session: &ClubSession,
        student_id: Uuid,
    ) -> StoreResult<CheckOutcome> {
        match self.store.find_record(session.id, student_id).await? {
            Some(existing) => {
                self.store.delete_record(existing.id).await?;
                info!(
                    "Toggled off check-in for student {} in session {}",
                    student_id, session.id
                );
                Ok(CheckOutcome::Removed {
                    student_id,
                    record_id: existing.id,
                    session_id: existing.session_id,
                })
            }
            None => {
                let record = self
                    .store
                    .insert_record(&NewAttendanceRecord {
                        session_id: session.id,
                        student_id,
                        check_in_at: self.clock.now(),
                    })
                    .await?;
                info!(
                    "Checked in student {} for session {}",
                    student_id, session.id
                );
                Ok(CheckOutcome::CheckedIn { record })
            }
        }
    }

    /// Set the student's check-out timestamp.
    ///
    /// Only valid after a check-in; invoked without one it returns
    /// `InvalidState` rather than silently doing nothing, so direct
    /// callers are guarded the same way the UI is.
    pub async fn check_out(
        &self,
        session: &ClubSession,
        student_id: Uuid,
    ) -> StoreResult<CheckOutcome> {
        let existing = self
            .store
            .find_record(session.id, student_id)
            .await?
            .ok_or_else(|| {
                StoreError::InvalidState(format!(
                    "student {} has no check-in for session {}",
                    student_id, session.id
                ))
            })?;

        let record = self.store.set_check_out(existing.id, self.clock.now()).await?;
        info!(
            "Checked out student {} from session {}",
            student_id, session.id
        );
        Ok(CheckOutcome::CheckedOut { record })
    }
}
