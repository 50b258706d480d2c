//! Realtime sync listener
//!
//! Consumes the store's change feed and folds each event into the
//! shared attendance view through the same `apply` transition the
//! reconciler path uses, so concurrent staff devices converge on the
//! same state. Feed liveness is observable through a watch channel;
//! losing the feed never clears existing local state.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use common::error::StoreResult;

use crate::store::{AttendanceStore, ChangeEvent};
use crate::view::AttendanceView;

/// Attendance view shared between the HTTP layer and the sync task
pub type SharedView = Arc<RwLock<AttendanceView>>;

/// Handle to a running sync listener
pub struct SyncHandle {
    live: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Whether the listener is currently receiving the change feed.
    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// A cloneable receiver of the liveness flag.
    pub fn live(&self) -> watch::Receiver<bool> {
        self.live.clone()
    }

    /// Stop the listener task. Local state is left as-is.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// Subscribes to the change feed and keeps the shared view current
pub struct SyncListener {
    store: Arc<dyn AttendanceStore>,
    view: SharedView,
}

impl SyncListener {
    pub fn new(store: Arc<dyn AttendanceStore>, view: SharedView) -> Self {
        Self { store, view }
    }

    /// Spawn the listener task and return its handle.
    ///
    /// The feed subscription is taken here, before the task runs, so no
    /// mutation issued after `spawn` returns can be missed. The initial
    /// liveness value mirrors the store's current feed health.
    pub fn spawn(self) -> SyncHandle {
        let events = self.store.subscribe();
        let health = self.store.feed_health();
        let (live_tx, live_rx) = watch::channel(*health.borrow());
        let task = tokio::spawn(self.run(events, health, live_tx));
        SyncHandle {
            live: live_rx,
            task,
        }
    }

    async fn run(
        self,
        mut events: broadcast::Receiver<ChangeEvent>,
        mut health: watch::Receiver<bool>,
        live: watch::Sender<bool>,
    ) {
        info!("Realtime sync listener started");

        loop {
            tokio::select! {
                changed = health.changed() => match changed {
                    Ok(()) => {
                        let up = *health.borrow_and_update();
                        let _ = live.send(up);
                        if up {
                            // events may have been missed while the
                            // transport was down
                            info!("Change feed transport recovered, resynchronizing");
                            if let Err(e) = resync(self.store.as_ref(), &self.view).await {
                                warn!("Resync after feed recovery failed: {}", e);
                            }
                        } else {
                            warn!("Change feed transport down, live sync paused");
                        }
                    }
                    Err(_) => {
                        let _ = live.send(false);
                        warn!("Change feed closed, live sync stopped");
                        break;
                    }
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        self.view.write().await.apply(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change feed lagged by {} events, resynchronizing", skipped);
                        if let Err(e) = resync(self.store.as_ref(), &self.view).await {
                            warn!("Resync after lag failed: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => {
                        // keep whatever state we have; updates simply stop
                        let _ = live.send(false);
                        warn!("Change feed closed, live sync stopped");
                        break;
                    }
                },
            }
        }
    }
}

/// Rebuild the shared view from persisted records.
///
/// Used after feed lag and after a failed mutation, when partial local
/// state can no longer be trusted.
pub async fn resync(store: &dyn AttendanceStore, view: &SharedView) -> StoreResult<()> {
    let session_id = view.read().await.session_id();
    let records = store.list_records(session_id).await?;

    let mut guard = view.write().await;
    // the active session may have rolled over while we were querying
    if guard.session_id() == session_id {
        *guard = AttendanceView::from_records(session_id, &records);
    }

    Ok(())
}
