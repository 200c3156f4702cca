//! Cluster notification layer.
//!
//! Propagates state-invalidation notifications between cooperating server
//! nodes: a transactional outbox buffers outgoing notifications until the
//! originating transaction commits, coalesces them per type, and hands the
//! compacted batch to the transport. Inbound messages update the node's
//! status counters and fan out to the registered cluster listeners.

mod message;
mod service;
mod status;

pub use message::ClusterNotificationMessage;
pub use service::{ClusterConfig, ClusterNotificationListener, ClusterSyncService};
pub use status::ClusterNodeStatus;
