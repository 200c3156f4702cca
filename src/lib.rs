//! # notibus
//!
//! A dual-layer notification bus for multi-node application clusters:
//!
//! - **Cluster layer**: propagates state-invalidation notifications between
//!   cooperating server nodes. Notifications published inside a transaction
//!   are buffered in a per-transaction outbox, coalesced per type, and only
//!   leave the node once the transaction commits.
//! - **Client layer**: fans notifications out from a node to the UI sessions
//!   attached to it, addressed by session ids, user ids, all sessions, or
//!   all nodes.
//!
//! Delivery is best-effort and fire-and-forget: transport failures and
//! listener errors are logged and swallowed, never retried, and never roll
//! back a committed transaction.
//!
//! ## Example
//!
//! ```ignore
//! use notibus::{
//!     ClusterConfig, ClusterSyncService, CoalescerRegistry, InProcessTopic, Transaction,
//! };
//! use notibus::notifications::{stock_coalescers, AccessControlChangedNotification};
//! use std::sync::Arc;
//!
//! let topic = InProcessTopic::new();
//! let service = ClusterSyncService::new(
//!     ClusterConfig::default(),
//!     topic,
//!     Arc::new(CoalescerRegistry::new(stock_coalescers())),
//! );
//! service.enable()?;
//!
//! // buffered until the surrounding transaction commits
//! Transaction::run(|| {
//!     service.publish_transactional(Arc::new(AccessControlChangedNotification::new([
//!         "alice".into(),
//!     ])))?;
//!     service.publish_transactional(Arc::new(AccessControlChangedNotification::new([
//!         "bob".into(),
//!     ])))?;
//!     Ok(())
//! })?;
//! // one message left the node, carrying {alice, bob}
//! ```

pub mod client;
pub mod cluster;
pub mod coalesce;
pub mod error;
pub mod handlers;
pub mod notifications;
pub mod session;
pub mod transaction;
pub mod transport;
pub mod types;

// Re-exports
pub use client::{
    AddressScope, ClientNotificationAddress, ClientNotificationClusterNotification,
    ClientNotificationDispatcher, ClientNotificationForwarder, NotificationMessage,
};
pub use cluster::{
    ClusterConfig, ClusterNotificationListener, ClusterNotificationMessage, ClusterNodeStatus,
    ClusterSyncService,
};
pub use coalesce::{CoalescerRegistry, NotificationCoalescer};
pub use error::{BusError, Result};
pub use handlers::{
    ChannelListener, NotificationHandler, NotificationHandlerRegistry, NotificationListener,
    ObservableNotificationHandler,
};
pub use session::{Session, SessionLifecycleListener, SessionRegistry, SessionScope};
pub use transaction::{Transaction, TransactionMember, TransactionScope};
pub use transport::{InProcessTopic, NotificationTransport, TransportListener};
pub use types::{NodeId, Notification, NotificationKind, SessionId, UserId};
