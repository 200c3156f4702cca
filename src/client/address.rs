//! Client notification addressing.

use crate::types::{NodeId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Recipient scope of a client notification.
///
/// Exactly one scope applies to any address; delivery evaluates them in this
/// fixed priority order: all nodes, all sessions, session ids, user ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressScope {
    AllNodes,
    AllSessions,
    Sessions(BTreeSet<SessionId>),
    Users(BTreeSet<UserId>),
}

/// Describes which sessions a client notification is delivered to.
///
/// Built only through the factory constructors, which uphold the
/// one-scope invariant; the id-set factories reject empty sets. The optional
/// excluded node id keeps a notification from echoing back to the node it
/// originated on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientNotificationAddress {
    scope: AddressScope,
    excluded_node_id: Option<NodeId>,
}

impl ClientNotificationAddress {
    /// Address a non-empty set of sessions.
    ///
    /// # Panics
    ///
    /// Panics when `session_ids` is empty; an address without recipients is
    /// a programming error.
    pub fn for_sessions(session_ids: impl IntoIterator<Item = SessionId>) -> Self {
        let ids: BTreeSet<SessionId> = session_ids.into_iter().collect();
        assert!(
            !ids.is_empty(),
            "session address requires at least one session id"
        );
        Self {
            scope: AddressScope::Sessions(ids),
            excluded_node_id: None,
        }
    }

    /// Address every session of a non-empty set of users.
    ///
    /// # Panics
    ///
    /// Panics when `user_ids` is empty.
    pub fn for_users(user_ids: impl IntoIterator<Item = UserId>) -> Self {
        let ids: BTreeSet<UserId> = user_ids.into_iter().collect();
        assert!(!ids.is_empty(), "user address requires at least one user id");
        Self {
            scope: AddressScope::Users(ids),
            excluded_node_id: None,
        }
    }

    /// Address every session on the receiving node.
    pub fn for_all_sessions() -> Self {
        Self {
            scope: AddressScope::AllSessions,
            excluded_node_id: None,
        }
    }

    /// Address the receiving nodes themselves, outside any session.
    pub fn for_all_nodes() -> Self {
        Self {
            scope: AddressScope::AllNodes,
            excluded_node_id: None,
        }
    }

    /// Exclude a node from delivery, typically the origin node.
    pub fn excluding_node(mut self, node_id: NodeId) -> Self {
        self.excluded_node_id = Some(node_id);
        self
    }

    pub fn scope(&self) -> &AddressScope {
        &self.scope
    }

    pub fn is_notify_all_nodes(&self) -> bool {
        matches!(self.scope, AddressScope::AllNodes)
    }

    pub fn is_notify_all_sessions(&self) -> bool {
        matches!(self.scope, AddressScope::AllSessions)
    }

    pub fn session_ids(&self) -> Option<&BTreeSet<SessionId>> {
        match &self.scope {
            AddressScope::Sessions(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn user_ids(&self) -> Option<&BTreeSet<UserId>> {
        match &self.scope {
            AddressScope::Users(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn excluded_node_id(&self) -> Option<&NodeId> {
        self.excluded_node_id.as_ref()
    }
}

// The broadcast scopes compare by scope alone; the id-set scopes also
// compare the excluded node id.
impl PartialEq for ClientNotificationAddress {
    fn eq(&self, other: &Self) -> bool {
        match (&self.scope, &other.scope) {
            (AddressScope::AllNodes, AddressScope::AllNodes) => true,
            (AddressScope::AllSessions, AddressScope::AllSessions) => true,
            _ => self.scope == other.scope && self.excluded_node_id == other.excluded_node_id,
        }
    }
}

impl Eq for ClientNotificationAddress {}

impl Hash for ClientNotificationAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.scope {
            AddressScope::AllNodes => 0u8.hash(state),
            AddressScope::AllSessions => 1u8.hash(state),
            AddressScope::Sessions(ids) => {
                2u8.hash(state);
                ids.hash(state);
                self.excluded_node_id.hash(state);
            }
            AddressScope::Users(ids) => {
                3u8.hash(state);
                ids.hash(state);
                self.excluded_node_id.hash(state);
            }
        }
    }
}
