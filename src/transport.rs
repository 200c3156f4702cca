//! Transport abstraction between cluster nodes.
//!
//! The bus does not own a wire protocol. It talks to a publish/subscribe
//! message service through [`NotificationTransport`] and receives inbound
//! messages through [`TransportListener`]. [`InProcessTopic`] is the
//! in-process implementation used in tests and single-process deployments;
//! real deployments plug in a broker-backed implementation.

use crate::cluster::ClusterNotificationMessage;
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Inbound entry point the transport calls for every received message.
pub trait TransportListener: Send + Sync {
    fn on_message(&self, message: ClusterNotificationMessage);
}

/// Outbound side of the publish/subscribe message service.
pub trait NotificationTransport: Send + Sync {
    /// Start delivering inbound messages to `listener`.
    fn subscribe(&self, listener: Arc<dyn TransportListener>) -> Result<()>;

    /// Stop delivering inbound messages to `listener`.
    fn unsubscribe(&self, listener: &Arc<dyn TransportListener>) -> Result<()>;

    /// Forward one outgoing batch. Delivery is best-effort; the caller never
    /// retries.
    fn publish_notifications(&self, batch: Vec<ClusterNotificationMessage>) -> Result<()>;
}

/// A shared topic delivering every published message to every subscriber.
///
/// Like a broker topic, the publisher receives its own messages back;
/// subscribers are expected to drop messages carrying their own origin node
/// id.
pub struct InProcessTopic {
    listeners: RwLock<Vec<Arc<dyn TransportListener>>>,
}

impl InProcessTopic {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: RwLock::new(Vec::new()),
        })
    }
}

impl NotificationTransport for InProcessTopic {
    fn subscribe(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.listeners.write().push(listener);
        Ok(())
    }

    fn unsubscribe(&self, listener: &Arc<dyn TransportListener>) -> Result<()> {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
        Ok(())
    }

    fn publish_notifications(&self, batch: Vec<ClusterNotificationMessage>) -> Result<()> {
        let listeners = self.listeners.read().clone();
        for message in batch {
            for listener in &listeners {
                listener.on_message(message.clone());
            }
        }
        Ok(())
    }
}
