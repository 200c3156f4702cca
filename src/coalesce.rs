//! Per-type coalescing of pending notifications.
//!
//! A burst of same-type notifications buffered in one transaction usually
//! carries redundant information (the same cache invalidated over and over,
//! overlapping user-id sets). Before a batch leaves the node, each type's
//! coalescer reduces its instances to a smaller, semantically equivalent set.

use crate::types::{kind_matches, Notification, NotificationKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Reduces a set of same-type pending notifications to an equivalent
/// smaller set.
///
/// `coalesce` receives all buffered instances of exactly one notification
/// type from one flush, never instances of other types. It must be pure:
/// the result depends only on the input instances.
pub trait NotificationCoalescer: Send + Sync {
    /// The kind this coalescer applies to (lineage matching, like handlers).
    fn handles(&self) -> NotificationKind;

    fn coalesce(&self, notifications: Vec<Arc<dyn Notification>>) -> Vec<Arc<dyn Notification>>;
}

/// Resolves the coalescer responsible for a notification type.
///
/// Built once at startup from all available coalescer implementations. When
/// several registered coalescers match a kind, the first registered one wins.
/// Types without a coalescer pass through unchanged.
pub struct CoalescerRegistry {
    registered: Vec<Arc<dyn NotificationCoalescer>>,
    /// Lookup result per concrete kind, memoized after first resolution.
    cache: Mutex<HashMap<NotificationKind, Option<Arc<dyn NotificationCoalescer>>>>,
}

impl CoalescerRegistry {
    pub fn new(coalescers: Vec<Arc<dyn NotificationCoalescer>>) -> Self {
        Self {
            registered: coalescers,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A registry with no coalescers; every type passes through unchanged.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Coalesce one type's buffered instances.
    ///
    /// Empty and single-element inputs are returned unchanged.
    pub fn coalesce(&self, notifications: Vec<Arc<dyn Notification>>) -> Vec<Arc<dyn Notification>> {
        if notifications.len() < 2 {
            return notifications;
        }
        match self.coalescer_for(notifications[0].as_ref()) {
            Some(coalescer) => coalescer.coalesce(notifications),
            None => notifications,
        }
    }

    fn coalescer_for(&self, notification: &dyn Notification) -> Option<Arc<dyn NotificationCoalescer>> {
        let kind = notification.kind();
        if let Some(cached) = self.cache.lock().get(&kind) {
            return cached.clone();
        }
        let resolved = self
            .registered
            .iter()
            .find(|c| kind_matches(c.handles(), notification))
            .cloned();
        self.cache
            .lock()
            .entry(kind)
            .or_insert_with(|| resolved.clone())
            .clone()
    }
}

impl Default for CoalescerRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    const COUNTER: NotificationKind = NotificationKind::new("counter");

    #[derive(Debug)]
    struct Counter(u64);

    impl Notification for Counter {
        fn kind(&self) -> NotificationKind {
            COUNTER
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Sums all counters into a single instance.
    struct SumCoalescer;

    impl NotificationCoalescer for SumCoalescer {
        fn handles(&self) -> NotificationKind {
            COUNTER
        }

        fn coalesce(&self, notifications: Vec<Arc<dyn Notification>>) -> Vec<Arc<dyn Notification>> {
            let total = notifications
                .iter()
                .filter_map(|n| n.downcast_ref::<Counter>())
                .map(|c| c.0)
                .sum();
            vec![Arc::new(Counter(total))]
        }
    }

    fn counters(values: &[u64]) -> Vec<Arc<dyn Notification>> {
        values
            .iter()
            .map(|v| Arc::new(Counter(*v)) as Arc<dyn Notification>)
            .collect()
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let registry = CoalescerRegistry::new(vec![Arc::new(SumCoalescer)]);
        assert!(registry.coalesce(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_instance_passes_through() {
        let registry = CoalescerRegistry::new(vec![Arc::new(SumCoalescer)]);
        let out = registry.coalesce(counters(&[7]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].downcast_ref::<Counter>().unwrap().0, 7);
    }

    #[test]
    fn test_registered_coalescer_applied() {
        let registry = CoalescerRegistry::new(vec![Arc::new(SumCoalescer)]);
        let out = registry.coalesce(counters(&[1, 2, 3]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].downcast_ref::<Counter>().unwrap().0, 6);
    }

    #[test]
    fn test_unregistered_type_is_identity() {
        let registry = CoalescerRegistry::empty();
        let out = registry.coalesce(counters(&[1, 2, 3]));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_lookup_is_memoized() {
        let registry = CoalescerRegistry::new(vec![Arc::new(SumCoalescer)]);
        registry.coalesce(counters(&[1, 2]));
        assert!(registry.cache.lock().contains_key(&COUNTER));
        // second flush resolves from the cache
        let out = registry.coalesce(counters(&[4, 5]));
        assert_eq!(out[0].downcast_ref::<Counter>().unwrap().0, 9);
    }
}
