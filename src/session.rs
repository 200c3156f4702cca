//! Session identity, registry and the current-session binding.
//!
//! A session is one connected client/UI context on a node and the unit of
//! client-notification addressing. Sessions are registered explicitly and
//! torn down explicitly: unregistering a session fires
//! [`SessionLifecycleListener::session_disposed`] so that listener maps keyed
//! by session id can drop their entries. Nothing in this crate relies on a
//! session being forgotten automatically.

use crate::error::{BusError, Result};
use crate::types::{SessionId, UserId};
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// One connected client session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Session>>> = RefCell::new(None);
}

impl Session {
    pub fn new(id: impl Into<SessionId>, user_id: impl Into<UserId>) -> Arc<Self> {
        Arc::new(Session {
            id: id.into(),
            user_id: user_id.into(),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The session bound to the current thread, if any.
    pub fn current() -> Option<Arc<Session>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// The session bound to the current thread, or `SessionRequired`.
    pub fn require_current() -> Result<Arc<Session>> {
        Self::current().ok_or(BusError::SessionRequired)
    }
}

/// Binds a session to the current thread for the guard's lifetime.
pub struct SessionScope {
    previous: Option<Arc<Session>>,
}

impl SessionScope {
    pub fn enter(session: Arc<Session>) -> Self {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(session));
        SessionScope { previous }
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Notified when a session is unregistered, so per-session state can be
/// dropped.
pub trait SessionLifecycleListener: Send + Sync {
    fn session_disposed(&self, session: &Session);
}

/// The sessions currently attached to this node.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    lifecycle_listeners: RwLock<Vec<Arc<dyn SessionLifecycleListener>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifecycle_listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, session: Arc<Session>) {
        self.sessions
            .write()
            .insert(session.id().clone(), session);
    }

    /// Remove a session and fire the disposal hooks.
    pub fn unregister(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(id);
        if let Some(session) = &removed {
            let listeners = self.lifecycle_listeners.read().clone();
            for listener in listeners {
                listener.session_disposed(session);
            }
        }
        removed
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn for_user(&self, user_id: &UserId) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect()
    }

    pub fn add_lifecycle_listener(&self, listener: Arc<dyn SessionLifecycleListener>) {
        self.lifecycle_listeners.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_scope_binds_current() {
        assert!(Session::current().is_none());
        let session = Session::new("s1", "u1");
        {
            let _scope = SessionScope::enter(session.clone());
            assert_eq!(Session::current().unwrap().id(), session.id());
        }
        assert!(Session::current().is_none());
    }

    #[test]
    fn test_scopes_nest() {
        let outer = Session::new("outer", "u1");
        let inner = Session::new("inner", "u1");
        let _outer_scope = SessionScope::enter(outer.clone());
        {
            let _inner_scope = SessionScope::enter(inner.clone());
            assert_eq!(Session::current().unwrap().id(), inner.id());
        }
        assert_eq!(Session::current().unwrap().id(), outer.id());
    }

    #[test]
    fn test_user_lookup() {
        let registry = SessionRegistry::new();
        registry.register(Session::new("s1", "alice"));
        registry.register(Session::new("s2", "bob"));
        registry.register(Session::new("s3", "alice"));

        let alice = registry.for_user(&UserId::from("alice"));
        assert_eq!(alice.len(), 2);
        assert_eq!(registry.for_user(&UserId::from("carol")).len(), 0);
    }

    #[test]
    fn test_unregister_fires_disposal_hook() {
        struct CountingListener(AtomicUsize);

        impl SessionLifecycleListener for CountingListener {
            fn session_disposed(&self, _session: &Session) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let registry = SessionRegistry::new();
        let listener = Arc::new(CountingListener(AtomicUsize::new(0)));
        registry.add_lifecycle_listener(listener.clone());

        registry.register(Session::new("s1", "u1"));
        registry.unregister(&SessionId::from("s1"));
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);

        // unknown session does not fire
        registry.unregister(&SessionId::from("s1"));
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }
}
