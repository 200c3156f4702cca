//! Notification handlers and listener dispatch.
//!
//! Handlers declare the notification kind they are responsible for; the
//! registry indexes them once at startup and resolves the handlers for a
//! concrete notification through its lineage. The observable handler adds a
//! listener registry on top, scoped either globally or to the session bound
//! to the dispatching thread.

mod observable;
mod registry;

pub use observable::{ChannelListener, NotificationListener, ObservableNotificationHandler};
pub use registry::{NotificationHandler, NotificationHandlerRegistry};
