//! Session resolver
//!
//! Computes the canonical club date for "now" and finds-or-creates the
//! persisted session for it.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use common::clock::{Clock, ClubCalendar};
use common::config::ClubConfig;
use common::error::{StoreError, StoreResult};

use crate::models::{ClubSession, NewSession};
use crate::store::AttendanceStore;

/// Resolves the current-or-upcoming club session, creating it lazily
pub struct SessionResolver {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    calendar: ClubCalendar,
    config: ClubConfig,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, config: ClubConfig) -> Self {
        Self {
            store,
            clock,
            calendar: config.calendar(),
            config,
        }
    }

    /// The club date the resolver currently targets: today when today is
    /// the club weekday, otherwise the next occurrence.
    pub fn target_date(&self) -> NaiveDate {
        self.calendar.club_date_for(self.clock.now())
    }

    /// Find the non-cancelled session for the target date, creating it
    /// with configured defaults when it does not exist yet.
    ///
    /// When two callers race on a never-before-seen date, one insert is
    /// rejected by the uniqueness constraint; that caller re-queries and
    /// returns the row the winner created. Resolution never fabricates a
    /// session: every returned value comes from the store.
    pub async fn resolve(&self) -> StoreResult<ClubSession> {
        let date = self.target_date();

        if let Some(session) = self.store.find_session_by_date(date).await? {
            return Ok(session);
        }

        let new_session = NewSession {
            session_date: date,
            start_time: self.config.session_start,
            end_time: self.config.session_end,
            timezone: self.calendar.timezone_name().to_string(),
        };

        match self.store.insert_session(&new_session).await {
            Ok(session) => {
                info!("Created session {} for {}", session.id, date);
                Ok(session)
            }
            Err(StoreError::Constraint(_)) => {
                // lost the creation race; the winner's row exists now
                info!("Session for {} created concurrently, re-querying", date);
                self.store.find_session_by_date(date).await?.ok_or_else(|| {
                    StoreError::Connectivity(format!(
                        "session for {} missing after constraint violation",
                        date
                    ))
                })
            }
            Err(e) => Err(e),
        }
    }
}
