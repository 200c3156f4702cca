//! Sent/received bookkeeping for one node.

use crate::cluster::message::ClusterNotificationMessage;
use crate::types::{NodeId, UserId};

/// Message counters and last-changed origin for one cluster service
/// instance.
///
/// Shared across all publishing and receiving threads of a node; the owning
/// service guards it with a single mutex so that counter increments and the
/// last-changed fields move together. Reset only by an explicit
/// disable/re-enable cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterNodeStatus {
    sent_message_count: u64,
    received_message_count: u64,
    last_changed_node_id: Option<NodeId>,
    last_changed_user_id: Option<UserId>,
}

impl ClusterNodeStatus {
    pub fn sent_message_count(&self) -> u64 {
        self.sent_message_count
    }

    pub fn received_message_count(&self) -> u64 {
        self.received_message_count
    }

    pub fn last_changed_node_id(&self) -> Option<&NodeId> {
        self.last_changed_node_id.as_ref()
    }

    pub fn last_changed_user_id(&self) -> Option<&UserId> {
        self.last_changed_user_id.as_ref()
    }

    pub(crate) fn update_sent(&mut self, count: u64, node_id: &NodeId, user_id: &UserId) {
        self.sent_message_count += count;
        self.last_changed_node_id = Some(node_id.clone());
        self.last_changed_user_id = Some(user_id.clone());
    }

    pub(crate) fn update_received(&mut self, message: &ClusterNotificationMessage) {
        self.received_message_count += 1;
        self.last_changed_node_id = Some(message.origin_node_id().clone());
        self.last_changed_user_id = Some(message.origin_user_id().clone());
    }

    pub(crate) fn reset(&mut self) {
        *self = ClusterNodeStatus::default();
    }
}
