//! Client notification layer.
//!
//! Fans notifications out from a node to the UI sessions attached to it.
//! A [`NotificationMessage`] pairs a payload with a
//! [`ClientNotificationAddress`] naming its recipients; the dispatcher
//! resolves the address against the local session registry and delivers
//! through the handler registry, binding each recipient session while its
//! listeners run.

mod address;
mod dispatcher;
mod message;

pub use address::{AddressScope, ClientNotificationAddress};
pub use dispatcher::{
    ClientNotificationClusterNotification, ClientNotificationDispatcher, ClientNotificationForwarder,
};
pub use message::NotificationMessage;
