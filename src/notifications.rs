//! Stock cluster notifications and their coalescers.
//!
//! Both notifications invalidate node-local caches and belong to the
//! [`INVALIDATION`] family, so a single handler can subscribe to every
//! cache-invalidation event.

use crate::coalesce::NotificationCoalescer;
use crate::types::{Notification, NotificationKind, UserId};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Family kind shared by the cache-invalidation notifications.
pub const INVALIDATION: NotificationKind = NotificationKind::new("invalidation");

/// The permission caches of the given users are stale.
///
/// An empty user-id set invalidates every user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlChangedNotification {
    user_ids: BTreeSet<UserId>,
}

impl AccessControlChangedNotification {
    pub const KIND: NotificationKind = NotificationKind::new("access-control-changed");

    pub fn new(user_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            user_ids: user_ids.into_iter().collect(),
        }
    }

    pub fn user_ids(&self) -> &BTreeSet<UserId> {
        &self.user_ids
    }
}

impl Notification for AccessControlChangedNotification {
    fn kind(&self) -> NotificationKind {
        Self::KIND
    }

    fn lineage(&self) -> Vec<NotificationKind> {
        vec![Self::KIND, INVALIDATION]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Merges buffered access-control notifications by unioning their user ids.
pub struct AccessControlCoalescer;

impl NotificationCoalescer for AccessControlCoalescer {
    fn handles(&self) -> NotificationKind {
        AccessControlChangedNotification::KIND
    }

    fn coalesce(&self, notifications: Vec<Arc<dyn Notification>>) -> Vec<Arc<dyn Notification>> {
        let mut user_ids = BTreeSet::new();
        let mut merged_any = false;
        let mut out: Vec<Arc<dyn Notification>> = Vec::new();
        for notification in notifications {
            match notification.downcast_ref::<AccessControlChangedNotification>() {
                Some(n) => {
                    user_ids.extend(n.user_ids().iter().cloned());
                    merged_any = true;
                }
                None => out.push(notification),
            }
        }
        if merged_any {
            out.push(Arc::new(AccessControlChangedNotification { user_ids }));
        }
        out
    }
}

/// The named code-type caches were reloaded and must be re-fetched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTypeChangedNotification {
    code_types: BTreeSet<String>,
}

impl CodeTypeChangedNotification {
    pub const KIND: NotificationKind = NotificationKind::new("code-type-changed");

    pub fn new(code_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            code_types: code_types.into_iter().collect(),
        }
    }

    pub fn code_types(&self) -> &BTreeSet<String> {
        &self.code_types
    }
}

impl Notification for CodeTypeChangedNotification {
    fn kind(&self) -> NotificationKind {
        Self::KIND
    }

    fn lineage(&self) -> Vec<NotificationKind> {
        vec![Self::KIND, INVALIDATION]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Merges buffered code-type notifications by unioning the changed types.
pub struct CodeTypeCoalescer;

impl NotificationCoalescer for CodeTypeCoalescer {
    fn handles(&self) -> NotificationKind {
        CodeTypeChangedNotification::KIND
    }

    fn coalesce(&self, notifications: Vec<Arc<dyn Notification>>) -> Vec<Arc<dyn Notification>> {
        let mut code_types = BTreeSet::new();
        let mut merged_any = false;
        let mut out: Vec<Arc<dyn Notification>> = Vec::new();
        for notification in notifications {
            match notification.downcast_ref::<CodeTypeChangedNotification>() {
                Some(n) => {
                    code_types.extend(n.code_types().iter().cloned());
                    merged_any = true;
                }
                None => out.push(notification),
            }
        }
        if merged_any {
            out.push(Arc::new(CodeTypeChangedNotification { code_types }));
        }
        out
    }
}

/// The coalescers for the stock notifications, ready for registration.
pub fn stock_coalescers() -> Vec<Arc<dyn NotificationCoalescer>> {
    vec![Arc::new(AccessControlCoalescer), Arc::new(CodeTypeCoalescer)]
}
