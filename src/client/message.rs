//! Addressed client notification.

use crate::client::address::ClientNotificationAddress;
use crate::types::Notification;
use std::sync::Arc;

/// Pairs a notification payload with the address of its recipients.
#[derive(Clone, Debug)]
pub struct NotificationMessage {
    address: ClientNotificationAddress,
    notification: Arc<dyn Notification>,
}

impl NotificationMessage {
    pub fn new(address: ClientNotificationAddress, notification: Arc<dyn Notification>) -> Self {
        Self {
            address,
            notification,
        }
    }

    pub fn address(&self) -> &ClientNotificationAddress {
        &self.address
    }

    pub fn notification(&self) -> &Arc<dyn Notification> {
        &self.notification
    }
}
