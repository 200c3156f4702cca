//! Cluster synchronization service and its transactional outbox.

use crate::cluster::message::ClusterNotificationMessage;
use crate::cluster::status::ClusterNodeStatus;
use crate::coalesce::CoalescerRegistry;
use crate::error::Result;
use crate::transaction::{Transaction, TransactionMember};
use crate::transport::{NotificationTransport, TransportListener};
use crate::types::{kind_matches, NodeId, Notification, NotificationKind, UserId};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Member id under which the outbox registers with the active transaction.
const OUTBOX_MEMBER_ID: &str = "notibus.cluster.outbox";

/// Environment variable consulted when no node id is configured.
const NODE_ID_ENV: &str = "NOTIBUS_NODE_ID";

/// Cluster service configuration.
#[derive(Clone, Debug, Default)]
pub struct ClusterConfig {
    /// This node's identifier. Resolution order: this value, then the
    /// `NOTIBUS_NODE_ID` environment variable, then a random UUID.
    pub node_id: Option<NodeId>,

    /// Identity stamped as origin user on outgoing messages.
    /// Default: "system".
    pub user_id: Option<UserId>,
}

fn resolve_node_id(config: &ClusterConfig) -> NodeId {
    if let Some(node_id) = &config.node_id {
        return node_id.clone();
    }
    if let Ok(node_id) = std::env::var(NODE_ID_ENV) {
        if !node_id.is_empty() {
            return NodeId::new(node_id);
        }
    }
    NodeId::new(uuid::Uuid::new_v4().to_string())
}

/// Receives inbound cluster notifications of a declared kind.
pub trait ClusterNotificationListener: Send + Sync {
    /// The kind this listener is interested in (lineage matching).
    fn handles(&self) -> NotificationKind;

    fn on_notification(&self, message: &ClusterNotificationMessage) -> Result<()>;
}

/// Propagates notifications between the nodes of a cluster.
///
/// Owns this node's identity, the enabled/disabled switch, the send/receive
/// statistics and the registered listeners. Outgoing notifications either go
/// out immediately ([`publish`](Self::publish)) or are buffered in a
/// per-transaction outbox and flushed, coalesced per type, when the
/// transaction commits ([`publish_transactional`](Self::publish_transactional)).
pub struct ClusterSyncService {
    node_id: NodeId,
    user_id: UserId,
    enabled: AtomicBool,
    /// One lock covers counters plus last-changed fields so they move
    /// together.
    status: Mutex<ClusterNodeStatus>,
    transport: Arc<dyn NotificationTransport>,
    coalescers: Arc<CoalescerRegistry>,
    listeners: RwLock<Vec<Arc<dyn ClusterNotificationListener>>>,
}

impl ClusterSyncService {
    pub fn new(
        config: ClusterConfig,
        transport: Arc<dyn NotificationTransport>,
        coalescers: Arc<CoalescerRegistry>,
    ) -> Arc<Self> {
        let node_id = resolve_node_id(&config);
        let user_id = config.user_id.unwrap_or_else(|| UserId::new("system"));
        Arc::new(Self {
            node_id,
            user_id,
            enabled: AtomicBool::new(false),
            status: Mutex::new(ClusterNodeStatus::default()),
            transport,
            coalescers,
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Snapshot of the send/receive statistics.
    pub fn status(&self) -> ClusterNodeStatus {
        self.status.lock().clone()
    }

    /// Subscribe to the transport and start publishing.
    ///
    /// Transitioning from disabled to enabled resets the status info; this
    /// is the only reset path.
    pub fn enable(self: &Arc<Self>) -> Result<()> {
        if self.is_enabled() {
            return Ok(());
        }
        let listener: Arc<dyn TransportListener> = self.clone();
        self.transport.subscribe(listener)?;
        self.status.lock().reset();
        self.enabled.store(true, Ordering::SeqCst);
        debug!(node_id = %self.node_id, "cluster synchronization enabled");
        Ok(())
    }

    /// Unsubscribe from the transport and stop publishing.
    pub fn disable(self: &Arc<Self>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.enabled.store(false, Ordering::SeqCst);
        let listener: Arc<dyn TransportListener> = self.clone();
        self.transport.unsubscribe(&listener)?;
        debug!(node_id = %self.node_id, "cluster synchronization disabled");
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn ClusterNotificationListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ClusterNotificationListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Send a notification to the other nodes immediately.
    ///
    /// No-op while disabled. For work running inside a transaction, prefer
    /// [`publish_transactional`](Self::publish_transactional) so the
    /// notification cannot leave the node before the transaction commits.
    pub fn publish(&self, notification: Arc<dyn Notification>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let message = self.wrap(notification);
        self.publish_batch(vec![message], 1);
        Ok(())
    }

    /// Buffer a notification in the current transaction's outbox.
    ///
    /// No-op while disabled. Fails with `TransactionRequired` when the
    /// calling thread has no bound transaction; callers without one use
    /// [`publish`](Self::publish) instead.
    pub fn publish_transactional(self: &Arc<Self>, notification: Arc<dyn Notification>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let tx = Transaction::require_current()?;
        let member = match tx.member(OUTBOX_MEMBER_ID) {
            Some(member) => member,
            None => {
                let member: Arc<dyn TransactionMember> = Arc::new(OutboxMember::new(self.clone()));
                tx.register_member(member.clone())?;
                member
            }
        };
        let outbox = member
            .as_any()
            .downcast_ref::<OutboxMember>()
            .expect("outbox member id is reserved for the cluster service");
        outbox.add(notification);
        Ok(())
    }

    fn wrap(&self, notification: Arc<dyn Notification>) -> ClusterNotificationMessage {
        ClusterNotificationMessage::new(notification, self.node_id.clone(), self.user_id.clone())
    }

    /// Forward a batch and update the sent statistics.
    ///
    /// `original_count` is the pre-coalesce notification count. A transport
    /// failure is logged and swallowed; the already-committed local
    /// transaction stands and the counters stay untouched.
    fn publish_batch(&self, batch: Vec<ClusterNotificationMessage>, original_count: u64) {
        if batch.is_empty() {
            return;
        }
        match self.transport.publish_notifications(batch) {
            Ok(()) => {
                self.status
                    .lock()
                    .update_sent(original_count, &self.node_id, &self.user_id);
            }
            Err(e) => {
                error!(error = %e, node_id = %self.node_id, "cluster notification send failed");
            }
        }
    }
}

impl TransportListener for ClusterSyncService {
    fn on_message(&self, message: ClusterNotificationMessage) {
        // the shared topic echoes our own messages back
        if message.origin_node_id() == &self.node_id {
            return;
        }
        self.status.lock().update_received(&message);

        let listeners = self.listeners.read().clone();
        let notification = message.notification();
        for listener in listeners {
            if !kind_matches(listener.handles(), notification.as_ref()) {
                continue;
            }
            if let Err(e) = listener.on_notification(&message) {
                error!(
                    error = %e,
                    kind = notification.kind().name(),
                    origin = %message.origin_node_id(),
                    "cluster notification listener failed"
                );
            }
        }
    }
}

/// Pending notifications of one in-flight transaction, keyed by kind.
#[derive(Default)]
struct PendingBuffer {
    by_kind: HashMap<NotificationKind, Vec<Arc<dyn Notification>>>,
    /// Pre-coalesce instance count; drives the sent statistics.
    total: u64,
}

/// Transaction member that flushes the buffered notifications after the
/// causing transaction has been committed, so other nodes are not informed
/// too early.
struct OutboxMember {
    service: Arc<ClusterSyncService>,
    /// Thread-confined to the transaction's driving thread; the lock only
    /// satisfies the `Send + Sync` bound on members.
    pending: Mutex<PendingBuffer>,
}

impl OutboxMember {
    fn new(service: Arc<ClusterSyncService>) -> Self {
        Self {
            service,
            pending: Mutex::new(PendingBuffer::default()),
        }
    }

    fn add(&self, notification: Arc<dyn Notification>) {
        let mut pending = self.pending.lock();
        pending
            .by_kind
            .entry(notification.kind())
            .or_default()
            .push(notification);
        pending.total += 1;
    }
}

impl TransactionMember for OutboxMember {
    fn member_id(&self) -> &str {
        OUTBOX_MEMBER_ID
    }

    fn needs_commit(&self) -> bool {
        self.pending.lock().total > 0
    }

    fn finalize_commit(&self) {
        let buffer = std::mem::take(&mut *self.pending.lock());
        if buffer.total == 0 {
            return;
        }
        // coalesce per kind; order across kinds is unspecified
        let mut batch = Vec::new();
        for (_, instances) in buffer.by_kind {
            for notification in self.service.coalescers.coalesce(instances) {
                batch.push(self.service.wrap(notification));
            }
        }
        self.service.publish_batch(batch, buffer.total);
    }

    fn rollback(&self) {
        *self.pending.lock() = PendingBuffer::default();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionScope;
    use std::any::Any;

    #[derive(Debug)]
    struct Ping;

    impl Notification for Ping {
        fn kind(&self) -> NotificationKind {
            NotificationKind::new("ping")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        batches: Mutex<Vec<Vec<ClusterNotificationMessage>>>,
    }

    impl NotificationTransport for RecordingTransport {
        fn subscribe(&self, _listener: Arc<dyn TransportListener>) -> Result<()> {
            Ok(())
        }

        fn unsubscribe(&self, _listener: &Arc<dyn TransportListener>) -> Result<()> {
            Ok(())
        }

        fn publish_notifications(&self, batch: Vec<ClusterNotificationMessage>) -> Result<()> {
            self.batches.lock().push(batch);
            Ok(())
        }
    }

    fn service(node: &str) -> (Arc<ClusterSyncService>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let config = ClusterConfig {
            node_id: Some(node.into()),
            user_id: Some("tester".into()),
        };
        let svc = ClusterSyncService::new(
            config,
            transport.clone(),
            Arc::new(CoalescerRegistry::empty()),
        );
        svc.enable().unwrap();
        (svc, transport)
    }

    #[test]
    fn test_disabled_publish_is_noop() {
        let (svc, transport) = service("node-a");
        svc.disable().unwrap();

        svc.publish(Arc::new(Ping)).unwrap();
        let tx = Transaction::new();
        let _scope = TransactionScope::enter(tx.clone());
        svc.publish_transactional(Arc::new(Ping)).unwrap();
        assert!(tx.commit_phase1());
        tx.commit_phase2();

        assert!(transport.batches.lock().is_empty());
        assert_eq!(svc.status(), ClusterNodeStatus::default());
    }

    #[test]
    fn test_transactional_without_transaction_fails() {
        let (svc, _transport) = service("node-a");
        let err = svc.publish_transactional(Arc::new(Ping)).unwrap_err();
        assert!(matches!(err, crate::error::BusError::TransactionRequired));
    }

    #[test]
    fn test_own_messages_are_dropped() {
        let (svc, _transport) = service("node-a");
        let message =
            ClusterNotificationMessage::new(Arc::new(Ping), "node-a".into(), "tester".into());
        svc.on_message(message);
        assert_eq!(svc.status().received_message_count(), 0);
    }

    #[test]
    fn test_reenable_resets_status() {
        let (svc, _transport) = service("node-a");
        svc.publish(Arc::new(Ping)).unwrap();
        assert_eq!(svc.status().sent_message_count(), 1);

        svc.disable().unwrap();
        svc.enable().unwrap();
        assert_eq!(svc.status(), ClusterNodeStatus::default());
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        struct FailingTransport;

        impl NotificationTransport for FailingTransport {
            fn subscribe(&self, _listener: Arc<dyn TransportListener>) -> Result<()> {
                Ok(())
            }

            fn unsubscribe(&self, _listener: &Arc<dyn TransportListener>) -> Result<()> {
                Ok(())
            }

            fn publish_notifications(
                &self,
                _batch: Vec<ClusterNotificationMessage>,
            ) -> Result<()> {
                Err(crate::error::BusError::Transport("broker down".into()))
            }
        }

        let svc = ClusterSyncService::new(
            ClusterConfig {
                node_id: Some("node-a".into()),
                user_id: None,
            },
            Arc::new(FailingTransport),
            Arc::new(CoalescerRegistry::empty()),
        );
        svc.enable().unwrap();

        svc.publish(Arc::new(Ping)).unwrap();
        // counters untouched on failed sends
        assert_eq!(svc.status().sent_message_count(), 0);
    }

    #[test]
    fn test_configured_node_id_wins() {
        let (svc, _transport) = service("node-a");
        assert_eq!(svc.node_id().as_str(), "node-a");
    }

    #[test]
    fn test_generated_node_ids_are_distinct() {
        let transport = Arc::new(RecordingTransport::default());
        let a = ClusterSyncService::new(
            ClusterConfig::default(),
            transport.clone(),
            Arc::new(CoalescerRegistry::empty()),
        );
        let b = ClusterSyncService::new(
            ClusterConfig::default(),
            transport,
            Arc::new(CoalescerRegistry::empty()),
        );
        assert_ne!(a.node_id(), b.node_id());
    }
}
