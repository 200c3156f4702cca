//! Node-to-node wire message.

use crate::types::{NodeId, Notification, UserId};
use std::sync::Arc;

/// Wraps a notification with its origin metadata for the node-to-node
/// channel.
///
/// The payload travels as a shared trait object; a broker-backed transport
/// encodes the concrete notification types it knows about.
#[derive(Clone, Debug)]
pub struct ClusterNotificationMessage {
    notification: Arc<dyn Notification>,
    origin_node_id: NodeId,
    origin_user_id: UserId,
}

impl ClusterNotificationMessage {
    pub fn new(
        notification: Arc<dyn Notification>,
        origin_node_id: NodeId,
        origin_user_id: UserId,
    ) -> Self {
        Self {
            notification,
            origin_node_id,
            origin_user_id,
        }
    }

    pub fn notification(&self) -> &Arc<dyn Notification> {
        &self.notification
    }

    pub fn origin_node_id(&self) -> &NodeId {
        &self.origin_node_id
    }

    pub fn origin_user_id(&self) -> &UserId {
        &self.origin_user_id
    }
}
