//! Application state shared across handlers
//!
//! The state owns the active-session cache: handlers go through
//! [`AppState::active_session`], which re-resolves the session and
//! rebuilds the shared view whenever the club date rolls over.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::warn;
use uuid::Uuid;

use common::error::StoreResult;

use crate::models::ClubSession;
use crate::realtime::{self, SharedView};
use crate::reconciler::AttendanceReconciler;
use crate::resolver::SessionResolver;
use crate::roster::RosterProvider;
use crate::store::AttendanceStore;
use crate::view::AttendanceView;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
    pub roster: Arc<dyn RosterProvider>,
    pub resolver: Arc<SessionResolver>,
    pub reconciler: Arc<AttendanceReconciler>,
    pub view: SharedView,
    session: Arc<RwLock<Option<ClubSession>>>,
    live: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        roster: Arc<dyn RosterProvider>,
        resolver: Arc<SessionResolver>,
        reconciler: Arc<AttendanceReconciler>,
        view: SharedView,
        live: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            roster,
            resolver,
            reconciler,
            view,
            session: Arc::new(RwLock::new(None)),
            live,
        }
    }

    /// An empty view the listener can share before the first resolution.
    pub fn initial_view() -> SharedView {
        Arc::new(RwLock::new(AttendanceView::new(Uuid::nil())))
    }

    /// Whether the realtime feed is currently live.
    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// The session for the current club date.
    ///
    /// Cached between calls; when the computed club date differs from
    /// the cached session's date, the session is re-resolved and the
    /// shared view rebuilt from persisted records.
    pub async fn active_session(&self) -> StoreResult<ClubSession> {
        let target = self.resolver.target_date();

        {
            let guard = self.session.read().await;
            if let Some(session) = guard.as_ref() {
                if session.session_date == target {
                    return Ok(session.clone());
                }
            }
        }

        let session = self.resolver.resolve().await?;
        let records = self.store.list_records(session.id).await?;

        let mut session_guard = self.session.write().await;
        let mut view_guard = self.view.write().await;
        *view_guard = AttendanceView::from_records(session.id, &records);
        *session_guard = Some(session.clone());

        Ok(session)
    }

    /// Rebuild the view from the store after a failed mutation. Errors
    /// here are logged, not surfaced: the original failure is what the
    /// caller reports.
    pub async fn resync_view(&self) {
        if let Err(e) = realtime::resync(self.store.as_ref(), &self.view).await {
            warn!("View resync failed: {}", e);
        }
    }
}
