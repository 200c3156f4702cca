//! Maps notification kinds to the handlers interested in them.

use crate::error::Result;
use crate::types::{Notification, NotificationKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Handles notifications of a declared kind.
pub trait NotificationHandler: Send + Sync {
    /// The kind this handler declares itself responsible for. A handler
    /// declared for [`NotificationKind::ANY`] receives every notification.
    fn handles(&self) -> NotificationKind;

    fn handle_notification(&self, notification: &Arc<dyn Notification>) -> Result<()>;
}

/// Indexes handlers by their declared kind.
///
/// Built once at startup from all available handler implementations. Lookup
/// for a concrete notification collects every handler whose declared kind
/// appears in the notification's lineage and memoizes the result per
/// concrete kind; the index is never invalidated afterwards. A kind with no
/// matching handler resolves to an empty set, not an error.
pub struct NotificationHandlerRegistry {
    by_kind: HashMap<NotificationKind, Vec<Arc<dyn NotificationHandler>>>,
    cache: Mutex<HashMap<NotificationKind, Vec<Arc<dyn NotificationHandler>>>>,
}

impl NotificationHandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn NotificationHandler>>) -> Self {
        let mut by_kind: HashMap<NotificationKind, Vec<Arc<dyn NotificationHandler>>> =
            HashMap::new();
        for handler in handlers {
            by_kind.entry(handler.handles()).or_default().push(handler);
        }
        Self {
            by_kind,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All handlers applicable to `notification`, resolved through its
    /// lineage.
    pub fn handlers_for(&self, notification: &dyn Notification) -> Vec<Arc<dyn NotificationHandler>> {
        let kind = notification.kind();
        if let Some(hit) = self.cache.lock().get(&kind) {
            return hit.clone();
        }
        let lineage = notification.lineage();
        let mut resolved = Vec::new();
        for (declared, handlers) in &self.by_kind {
            if *declared == NotificationKind::ANY || lineage.contains(declared) {
                resolved.extend(handlers.iter().cloned());
            }
        }
        self.cache
            .lock()
            .entry(kind)
            .or_insert_with(|| resolved.clone());
        resolved
    }

    /// Deliver `notification` to every applicable handler.
    ///
    /// A failing handler is logged and does not stop the remaining ones.
    pub fn notify_handlers(&self, notification: &Arc<dyn Notification>) {
        for handler in self.handlers_for(notification.as_ref()) {
            if let Err(e) = handler.handle_notification(notification) {
                error!(
                    error = %e,
                    kind = notification.kind().name(),
                    "notification handler failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const GROUPED: NotificationKind = NotificationKind::new("grouped");
    const MEMBER: NotificationKind = NotificationKind::new("member");
    const LONER: NotificationKind = NotificationKind::new("loner");

    /// Belongs to the "grouped" family.
    #[derive(Debug)]
    struct MemberNotification;

    impl Notification for MemberNotification {
        fn kind(&self) -> NotificationKind {
            MEMBER
        }

        fn lineage(&self) -> Vec<NotificationKind> {
            vec![MEMBER, GROUPED]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct LonerNotification;

    impl Notification for LonerNotification {
        fn kind(&self) -> NotificationKind {
            LONER
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct CountingHandler {
        declared: NotificationKind,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHandler {
        fn new(declared: NotificationKind) -> Arc<Self> {
            Arc::new(Self {
                declared,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing(declared: NotificationKind) -> Arc<Self> {
            Arc::new(Self {
                declared,
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NotificationHandler for CountingHandler {
        fn handles(&self) -> NotificationKind {
            self.declared
        }

        fn handle_notification(&self, _notification: &Arc<dyn Notification>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::error::BusError::Listener("handler failed".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_any_handler_receives_everything() {
        let any = CountingHandler::new(NotificationKind::ANY);
        let grouped = CountingHandler::new(GROUPED);
        let registry = NotificationHandlerRegistry::new(vec![any.clone(), grouped.clone()]);

        registry.notify_handlers(&(Arc::new(LonerNotification) as Arc<dyn Notification>));
        assert_eq!(any.calls(), 1);
        assert_eq!(grouped.calls(), 0);
    }

    #[test]
    fn test_super_kind_handler_receives_member() {
        let any = CountingHandler::new(NotificationKind::ANY);
        let grouped = CountingHandler::new(GROUPED);
        let registry = NotificationHandlerRegistry::new(vec![any.clone(), grouped.clone()]);

        let n: Arc<dyn Notification> = Arc::new(MemberNotification);
        registry.notify_handlers(&n);
        registry.notify_handlers(&n);
        assert_eq!(any.calls(), 2);
        assert_eq!(grouped.calls(), 2);
    }

    #[test]
    fn test_unknown_kind_resolves_empty() {
        let registry = NotificationHandlerRegistry::new(vec![CountingHandler::new(GROUPED)]);
        let n: Arc<dyn Notification> = Arc::new(LonerNotification);
        assert!(registry.handlers_for(n.as_ref()).is_empty());
        // miss is memoized too
        assert!(registry.cache.lock().contains_key(&LONER));
    }

    #[test]
    fn test_failing_handler_does_not_stop_siblings() {
        let failing = CountingHandler::failing(NotificationKind::ANY);
        let healthy = CountingHandler::new(NotificationKind::ANY);
        let registry = NotificationHandlerRegistry::new(vec![failing.clone(), healthy.clone()]);

        registry.notify_handlers(&(Arc::new(LonerNotification) as Arc<dyn Notification>));
        assert_eq!(failing.calls(), 1);
        assert_eq!(healthy.calls(), 1);
    }
}
