//! Transaction context with two-phase-commit members.
//!
//! A transaction is driven by exactly one thread. Components that must act
//! on commit or rollback (such as the cluster outbox) register themselves as
//! [`TransactionMember`]s on the transaction bound to the current thread.
//! Commit runs in two phases: every member votes in [`prepare`]
//! ([`TransactionMember::prepare`]); only when all vote yes does
//! [`finalize_commit`](TransactionMember::finalize_commit) run.

use crate::error::{BusError, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

/// A participant in a transaction's completion.
pub trait TransactionMember: Send + Sync {
    /// Identifies this member within its transaction.
    fn member_id(&self) -> &str;

    /// Whether this member has anything to commit.
    fn needs_commit(&self) -> bool {
        true
    }

    /// First commit phase. Returning `false` vetoes the commit.
    fn prepare(&self) -> bool {
        true
    }

    /// Second commit phase; runs only after every member prepared.
    fn finalize_commit(&self) {}

    /// The transaction was rolled back; discard pending work.
    fn rollback(&self) {}

    /// The transaction is being released; free resources.
    fn release(&self) {}

    fn as_any(&self) -> &dyn Any;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// One in-flight transaction and its registered members.
pub struct Transaction {
    members: Mutex<Vec<Arc<dyn TransactionMember>>>,
    state: Mutex<TxState>,
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Transaction>>> = RefCell::new(None);
}

impl Transaction {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            members: Mutex::new(Vec::new()),
            state: Mutex::new(TxState::Active),
        })
    }

    /// The transaction bound to the current thread, if any.
    pub fn current() -> Option<Arc<Transaction>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// The transaction bound to the current thread, or `TransactionRequired`.
    pub fn require_current() -> Result<Arc<Transaction>> {
        Self::current().ok_or(BusError::TransactionRequired)
    }

    /// Register a member; fails on duplicate ids or completed transactions.
    pub fn register_member(&self, member: Arc<dyn TransactionMember>) -> Result<()> {
        if *self.state.lock() != TxState::Active {
            return Err(BusError::TransactionCompleted);
        }
        let mut members = self.members.lock();
        if members.iter().any(|m| m.member_id() == member.member_id()) {
            return Err(BusError::DuplicateMember(member.member_id().to_string()));
        }
        members.push(member);
        Ok(())
    }

    /// Look up a registered member by id.
    pub fn member(&self, member_id: &str) -> Option<Arc<dyn TransactionMember>> {
        self.members
            .lock()
            .iter()
            .find(|m| m.member_id() == member_id)
            .cloned()
    }

    /// First commit phase: every member with pending work votes.
    pub fn commit_phase1(&self) -> bool {
        if *self.state.lock() != TxState::Active {
            return false;
        }
        let members = self.members.lock().clone();
        members
            .iter()
            .filter(|m| m.needs_commit())
            .all(|m| m.prepare())
    }

    /// Second commit phase: finalize every member with pending work.
    pub fn commit_phase2(&self) {
        {
            let mut state = self.state.lock();
            if *state != TxState::Active {
                return;
            }
            *state = TxState::Committed;
        }
        let members = self.members.lock().clone();
        for member in members {
            if member.needs_commit() {
                member.finalize_commit();
            }
        }
    }

    /// Discard pending work on every member. No-op once completed.
    pub fn rollback(&self) {
        {
            let mut state = self.state.lock();
            if *state != TxState::Active {
                return;
            }
            *state = TxState::RolledBack;
        }
        let members = self.members.lock().clone();
        for member in members {
            member.rollback();
        }
    }

    /// Release all members and drop them from the transaction.
    pub fn release(&self) {
        let members = std::mem::take(&mut *self.members.lock());
        for member in members {
            member.release();
        }
    }

    /// Run `f` inside a fresh transaction bound to the current thread.
    ///
    /// Commits when `f` returns `Ok`, rolls back on `Err` or when a member
    /// vetoes the prepare phase.
    pub fn run<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = Transaction::new();
        let scope = TransactionScope::enter(tx.clone());
        let result = f();
        let result = match result {
            Ok(value) => {
                if tx.commit_phase1() {
                    tx.commit_phase2();
                    Ok(value)
                } else {
                    tx.rollback();
                    Err(BusError::PrepareFailed)
                }
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        };
        tx.release();
        drop(scope);
        result
    }
}

/// Binds a transaction to the current thread for the guard's lifetime.
///
/// The previously bound transaction (if any) is restored on drop, so scopes
/// nest.
pub struct TransactionScope {
    previous: Option<Arc<Transaction>>,
}

impl TransactionScope {
    pub fn enter(tx: Arc<Transaction>) -> Self {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(tx));
        TransactionScope { previous }
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}
