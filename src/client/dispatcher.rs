//! Routes client notification messages to local sessions.

use crate::client::address::AddressScope;
use crate::client::message::NotificationMessage;
use crate::cluster::{ClusterNotificationListener, ClusterNotificationMessage};
use crate::error::Result;
use crate::handlers::NotificationHandlerRegistry;
use crate::session::{Session, SessionRegistry, SessionScope};
use crate::types::{NodeId, Notification, NotificationKind};
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Delivers addressed notifications to the sessions of this node.
///
/// An address resolving to zero local recipients is a silent no-op.
pub struct ClientNotificationDispatcher {
    node_id: NodeId,
    sessions: Arc<SessionRegistry>,
    handlers: Arc<NotificationHandlerRegistry>,
}

impl ClientNotificationDispatcher {
    pub fn new(
        node_id: NodeId,
        sessions: Arc<SessionRegistry>,
        handlers: Arc<NotificationHandlerRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            node_id,
            sessions,
            handlers,
        })
    }

    pub fn dispatch(&self, message: &NotificationMessage) {
        let address = message.address();
        if address.excluded_node_id() == Some(&self.node_id) {
            debug!(node_id = %self.node_id, "dropping notification excluded for this node");
            return;
        }

        // scopes in delivery priority order: all nodes, all sessions,
        // session ids, user ids
        let recipients: Vec<Arc<Session>> = match address.scope() {
            AddressScope::AllNodes => {
                // node-level delivery happens outside any session
                self.handlers.notify_handlers(message.notification());
                return;
            }
            AddressScope::AllSessions => self.sessions.all(),
            AddressScope::Sessions(ids) => {
                ids.iter().filter_map(|id| self.sessions.get(id)).collect()
            }
            AddressScope::Users(ids) => ids
                .iter()
                .flat_map(|user_id| self.sessions.for_user(user_id))
                .collect(),
        };

        for session in recipients {
            let _scope = SessionScope::enter(session);
            self.handlers.notify_handlers(message.notification());
        }
    }
}

/// Cluster notification carrying a client notification to the other nodes.
///
/// A node that wants a client notification delivered cluster-wide publishes
/// one of these; the [`ClientNotificationForwarder`] on each receiving node
/// unwraps it and hands it to the local dispatcher.
#[derive(Debug)]
pub struct ClientNotificationClusterNotification {
    message: NotificationMessage,
}

impl ClientNotificationClusterNotification {
    pub const KIND: NotificationKind = NotificationKind::new("client-notification");

    pub fn new(message: NotificationMessage) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &NotificationMessage {
        &self.message
    }
}

impl Notification for ClientNotificationClusterNotification {
    fn kind(&self) -> NotificationKind {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Cluster listener bridging the cluster layer into the client layer.
pub struct ClientNotificationForwarder {
    dispatcher: Arc<ClientNotificationDispatcher>,
}

impl ClientNotificationForwarder {
    pub fn new(dispatcher: Arc<ClientNotificationDispatcher>) -> Arc<Self> {
        Arc::new(Self { dispatcher })
    }
}

impl ClusterNotificationListener for ClientNotificationForwarder {
    fn handles(&self) -> NotificationKind {
        ClientNotificationClusterNotification::KIND
    }

    fn on_notification(&self, message: &ClusterNotificationMessage) -> Result<()> {
        if let Some(wrapped) = message
            .notification()
            .downcast_ref::<ClientNotificationClusterNotification>()
        {
            self.dispatcher.dispatch(wrapped.message());
        }
        Ok(())
    }
}
