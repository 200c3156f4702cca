//! Core identifiers and the notification contract.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Identifier of one node participating in the cluster.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// Identifier of one connected client session on a node.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        SessionId(id)
    }
}

/// Identifier of the user owning a session or causing a change.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId(id)
    }
}

/// Type tag identifying one notification type.
///
/// Handlers, listeners and coalescers declare the kind they are responsible
/// for; the bus matches a concrete notification against those declarations
/// through its [`Notification::lineage`]. [`NotificationKind::ANY`] acts as
/// the root of the hierarchy and matches every notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKind(&'static str);

impl NotificationKind {
    /// Matches every notification, regardless of its concrete kind.
    pub const ANY: NotificationKind = NotificationKind("*");

    pub const fn new(name: &'static str) -> Self {
        NotificationKind(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationKind({})", self.0)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable payload describing one state change of interest to other
/// nodes or sessions.
///
/// A notification has no identity beyond its fields. Concrete payload types
/// are plain structs; the bus moves them around as `Arc<dyn Notification>`
/// and transports are responsible for encoding the concrete types they know.
///
/// Each concrete type declares a unique [`kind`](Notification::kind). Types
/// that belong to a broader family additionally list the family kinds in
/// [`lineage`](Notification::lineage) so that handlers registered for a
/// super-kind receive them too.
pub trait Notification: fmt::Debug + Send + Sync + 'static {
    /// The concrete kind of this notification.
    fn kind(&self) -> NotificationKind;

    /// The concrete kind followed by any declared super-kinds.
    fn lineage(&self) -> Vec<NotificationKind> {
        vec![self.kind()]
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Notification {
    /// Downcast to a concrete notification type.
    pub fn downcast_ref<T: Notification>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Whether a declaration for `declared` applies to `notification`.
pub(crate) fn kind_matches(declared: NotificationKind, notification: &dyn Notification) -> bool {
    declared == NotificationKind::ANY || notification.lineage().contains(&declared)
}
