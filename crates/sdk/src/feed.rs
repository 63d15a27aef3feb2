//! Polling notification feed.
//!
//! Periodically re-synchronizes the notification collection and derives the
//! unread count. The poll is a cancellable scheduled task tied to the
//! session's cancellation token: started on session acquire, stopped on
//! session clear or handle drop, never implicitly tied to rendering.
//!
//! Overlap guard: a tick that fires while a fetch is in flight is skipped,
//! not queued, so a slow backend never accumulates concurrent requests.
//!
//! Mutation symmetry follows the console's observed behavior: mark-read is
//! optimistic without a rollback path (non-destructive), deletion is
//! confirm-then-apply (destructive actions are not auto-reversible).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use masthead_types::{Notification, NotificationId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::ConsoleApi;
use crate::error::Result;
use crate::session::SessionStore;

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<Notification>,
    last_error: Option<String>,
}

#[derive(Debug)]
struct FeedInner {
    api: ConsoleApi,
    session: Arc<SessionStore>,
    state: Mutex<FeedState>,
    in_flight: AtomicBool,
    poll_interval: Duration,
}

/// The admin notification feed. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    inner: Arc<FeedInner>,
}

/// Handle to a running polling task. Stops the poll when dropped.
#[derive(Debug)]
pub struct PollingHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Stops the polling task.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether the polling task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl NotificationFeed {
    /// Creates a feed over the typed API and session store.
    #[must_use]
    pub fn new(api: ConsoleApi, session: Arc<SessionStore>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                api,
                session,
                state: Mutex::new(FeedState::default()),
                in_flight: AtomicBool::new(false),
                poll_interval,
            }),
        }
    }

    /// Starts the polling task: an immediate fetch, then one per interval.
    ///
    /// The task exits when the session ends (its cancellation token fires or
    /// a sync observes `Unauthorized`) or when the returned handle stops it.
    /// Background sync failures degrade to stale data; they never interrupt
    /// the user.
    #[must_use]
    pub fn start_polling(&self) -> PollingHandle {
        let token = self.inner.session.cancellation_token().child_token();
        let feed = self.clone();
        let task = tokio::spawn({
            let token = token.clone();
            async move {
                let mut tick = tokio::time::interval(feed.inner.poll_interval);
                tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        () = token.cancelled() => break,
                        _ = tick.tick() => {
                            if !feed.inner.session.is_authenticated() {
                                break;
                            }
                            match feed.sync_now().await {
                                Ok(_) => {}
                                Err(err) if err.is_unauthorized() => {
                                    tracing::debug!("notification poll stopping: session ended");
                                    break;
                                }
                                Err(err) => {
                                    tracing::warn!(error = %err, "notification poll failed; keeping stale data");
                                }
                            }
                        }
                    }
                }
            }
        });
        PollingHandle { token, task }
    }

    /// Fetches the notification collection once. Returns `Ok(false)` when a
    /// fetch was already in flight and this one was skipped.
    ///
    /// # Errors
    ///
    /// Propagates gateway failures; on `Transport` the previous items are
    /// kept and the error message is retained for display.
    pub async fn sync_now(&self) -> Result<bool> {
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("notification sync already in flight; skipping");
            return Ok(false);
        }
        let outcome = self.inner.api.fetch_notifications().await;
        self.inner.in_flight.store(false, Ordering::SeqCst);

        match outcome {
            Ok(items) => {
                let mut state = self.inner.state.lock();
                state.items = items;
                state.last_error = None;
                Ok(true)
            }
            Err(err) => {
                if !err.is_unauthorized() {
                    self.inner.state.lock().last_error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// The current notification entries, newest first as the backend
    /// returned them.
    #[must_use]
    pub fn items(&self) -> Vec<Notification> {
        self.inner.state.lock().items.clone()
    }

    /// Derived unread count: entries with `read == false`. Never stored
    /// separately, so it cannot drift from the items.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner.state.lock().items.iter().filter(|n| !n.read).count()
    }

    /// Message from the last failed background sync, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }

    /// Marks one notification read: optimistic local update, then the
    /// backend call. No rollback path, matching the console's behavior for
    /// non-destructive marks.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; the local mark stands.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if let Some(item) = state.items.iter_mut().find(|n| &n.id == id) {
                item.read = true;
            }
        }
        self.inner.api.mark_notification_read(id).await
    }

    /// Marks every notification read, optimistically. Idempotent: a second
    /// call finds nothing unread and the count stays 0.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure; the local marks stand.
    pub async fn mark_all_read(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            for item in &mut state.items {
                item.read = true;
            }
        }
        self.inner.api.mark_all_notifications_read().await
    }

    /// Deletes one notification. Confirm-then-apply: the entry leaves the
    /// local list only on confirmed success.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure, with the entry left in place.
    pub async fn delete(&self, id: &NotificationId) -> Result<()> {
        self.inner.api.delete_notification(id).await?;
        self.inner.state.lock().items.retain(|n| &n.id != id);
        Ok(())
    }

    /// Deletes every notification. Confirm-then-apply.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure, with the entries left in place.
    pub async fn delete_all(&self) -> Result<()> {
        self.inner.api.delete_all_notifications().await?;
        self.inner.state.lock().items.clear();
        Ok(())
    }
}
