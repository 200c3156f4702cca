//! Per-session and global listener registry with synchronous dispatch.

use crate::error::{BusError, Result};
use crate::handlers::registry::NotificationHandler;
use crate::session::{Session, SessionLifecycleListener};
use crate::types::{Notification, NotificationKind, SessionId};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Receives notifications dispatched by an
/// [`ObservableNotificationHandler`].
pub trait NotificationListener: Send + Sync {
    fn notify(&self, notification: &Arc<dyn Notification>) -> Result<()>;
}

/// Notification handler that fans out to registered listeners.
///
/// Listeners are either global (session-agnostic) or scoped to one session.
/// When a notification arrives while a session is bound to the dispatching
/// thread, only that session's listeners see it; with no session bound, only
/// the global listeners do.
///
/// Session entries do not disappear on their own: wire the handler into a
/// [`SessionRegistry`](crate::session::SessionRegistry) as a lifecycle
/// listener (or call [`drop_session_listeners`](Self::drop_session_listeners)
/// from the session's disposal hook) so a listener never outlives its
/// session.
pub struct ObservableNotificationHandler {
    kind: NotificationKind,
    global: Mutex<Vec<Arc<dyn NotificationListener>>>,
    by_session: Mutex<HashMap<SessionId, Vec<Arc<dyn NotificationListener>>>>,
}

impl ObservableNotificationHandler {
    pub fn new(kind: NotificationKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            global: Mutex::new(Vec::new()),
            by_session: Mutex::new(HashMap::new()),
        })
    }

    /// Register a listener for the session bound to the current thread.
    pub fn add_listener(&self, listener: Arc<dyn NotificationListener>) -> Result<()> {
        let session = Session::require_current()?;
        self.by_session
            .lock()
            .entry(session.id().clone())
            .or_default()
            .push(listener);
        Ok(())
    }

    /// Remove a listener of the session bound to the current thread.
    pub fn remove_listener(&self, listener: &Arc<dyn NotificationListener>) -> Result<()> {
        let session = Session::require_current()?;
        let mut by_session = self.by_session.lock();
        if let Some(listeners) = by_session.get_mut(session.id()) {
            listeners.retain(|l| !Arc::ptr_eq(l, listener));
            if listeners.is_empty() {
                by_session.remove(session.id());
            }
        }
        Ok(())
    }

    /// Register a session-independent listener.
    pub fn add_global_listener(&self, listener: Arc<dyn NotificationListener>) {
        self.global.lock().push(listener);
    }

    pub fn remove_global_listener(&self, listener: &Arc<dyn NotificationListener>) {
        self.global.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Drop all listeners registered for `session_id`.
    pub fn drop_session_listeners(&self, session_id: &SessionId) {
        self.by_session.lock().remove(session_id);
    }
}

impl NotificationHandler for ObservableNotificationHandler {
    fn handles(&self) -> NotificationKind {
        self.kind
    }

    fn handle_notification(&self, notification: &Arc<dyn Notification>) -> Result<()> {
        // snapshot, so concurrent add/remove cannot disturb the iteration
        let listeners = match Session::current() {
            None => self.global.lock().clone(),
            Some(session) => self
                .by_session
                .lock()
                .get(session.id())
                .cloned()
                .unwrap_or_default(),
        };
        for listener in listeners {
            if let Err(e) = listener.notify(notification) {
                error!(
                    error = %e,
                    kind = notification.kind().name(),
                    "notification listener failed"
                );
            }
        }
        Ok(())
    }
}

impl SessionLifecycleListener for ObservableNotificationHandler {
    fn session_disposed(&self, session: &Session) {
        self.drop_session_listeners(session.id());
    }
}

/// Listener adapter forwarding notifications into a bounded channel.
///
/// Lets a session loop consume its notifications from a
/// [`Receiver`] instead of implementing a listener. Sending never blocks the
/// dispatching thread: when the receiver is full or gone, the notification
/// is rejected and the dispatch loop logs it.
pub struct ChannelListener {
    sender: Sender<Arc<dyn Notification>>,
}

impl ChannelListener {
    pub fn bounded(capacity: usize) -> (Arc<Self>, Receiver<Arc<dyn Notification>>) {
        let (sender, receiver) = bounded(capacity);
        (Arc::new(Self { sender }), receiver)
    }
}

impl NotificationListener for ChannelListener {
    fn notify(&self, notification: &Arc<dyn Notification>) -> Result<()> {
        self.sender
            .try_send(Arc::clone(notification))
            .map_err(|e| match e {
                TrySendError::Full(_) => BusError::Listener("notification channel full".into()),
                TrySendError::Disconnected(_) => {
                    BusError::Listener("notification channel disconnected".into())
                }
            })
    }
}
