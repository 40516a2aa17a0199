//! Predicate Lock Table
//!
//! Registry of the predicate locks of live transactions. A transaction first
//! declares its predicates privately, then publishes its lock; from then on
//! the lock is read-only and other transactions are checked against it.
//! What to do about a conflict (wait, abort, retry) is left to the caller.

use crate::breakdown::PredicateNode;
use crate::config::LockConfig;
use crate::error::{PredicateError, Result};
use crate::predicate::SharedPredicate;
use crate::predicate_lock::{IsolationLevel, PredicateLock};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Unique transaction identifier
pub type TransactionId = u64;

/// Lock table - tracks the predicate locks of all live transactions
pub struct PredicateLockTable {
    config: LockConfig,
    /// Next transaction ID to allocate
    next_txn_id: AtomicU64,
    /// Locks still being declared by their transaction
    declaring: RwLock<HashMap<TransactionId, PredicateLock>>,
    /// Published, read-only locks
    published: RwLock<HashMap<TransactionId, Arc<PredicateLock>>>,
}

impl PredicateLockTable {
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    pub fn with_config(config: LockConfig) -> Self {
        PredicateLockTable {
            config,
            next_txn_id: AtomicU64::new(1),
            declaring: RwLock::new(HashMap::new()),
            published: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Begin declaring predicates for a new transaction
    pub fn begin(&self, isolation_level: Option<IsolationLevel>) -> TransactionId {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let level = isolation_level.unwrap_or(self.config.default_isolation);

        self.declaring.write().insert(txn_id, PredicateLock::new(level));
        debug!(txn_id, ?level, "transaction began declaring predicates");

        txn_id
    }

    pub fn declare_read(&self, txn_id: TransactionId, predicate: SharedPredicate) -> Result<()> {
        self.with_declaring(txn_id, |lock| {
            lock.add_predicate_read(predicate);
            Ok(())
        })
    }

    pub fn declare_write(&self, txn_id: TransactionId, predicate: SharedPredicate) -> Result<()> {
        self.with_declaring(txn_id, |lock| {
            lock.add_predicate_write(predicate);
            Ok(())
        })
    }

    /// Break a predicate tree down into the transaction's read set
    pub fn declare_read_tree(&self, txn_id: TransactionId, predicate: &PredicateNode) -> Result<usize> {
        self.with_declaring(txn_id, |lock| lock.declare_read(predicate))
    }

    /// Break a predicate tree down into the transaction's write set
    pub fn declare_write_tree(&self, txn_id: TransactionId, predicate: &PredicateNode) -> Result<usize> {
        self.with_declaring(txn_id, |lock| lock.declare_write(predicate))
    }

    /// End the declaration phase.
    ///
    /// The lock becomes visible to conflict checks. Returns the already
    /// published transactions it conflicts with.
    pub fn publish(&self, txn_id: TransactionId) -> Result<Vec<TransactionId>> {
        // lock order: declaring, then published
        let mut declaring = self.declaring.write();
        let mut published = self.published.write();

        let lock = match declaring.remove(&txn_id) {
            Some(lock) => lock,
            None if published.contains_key(&txn_id) => {
                return Err(PredicateError::AlreadyPublished(txn_id));
            }
            None => return Err(PredicateError::UnknownTransaction(txn_id)),
        };

        let conflicts = match self.conflicts_among(txn_id, &lock, &published) {
            Ok(conflicts) => conflicts,
            Err(e) => {
                declaring.insert(txn_id, lock);
                return Err(e);
            }
        };
        info!(
            txn_id,
            predicates = lock.num_predicates(),
            conflicts = conflicts.len(),
            "predicate lock published"
        );
        published.insert(txn_id, Arc::new(lock));

        Ok(conflicts)
    }

    /// Published transactions whose locks conflict with `txn_id`'s lock
    pub fn conflicts(&self, txn_id: TransactionId) -> Result<Vec<TransactionId>> {
        let published = self.published.read();
        let lock = published
            .get(&txn_id)
            .ok_or(PredicateError::UnknownTransaction(txn_id))?;

        self.conflicts_among(txn_id, lock, &published)
    }

    /// Discard the transaction's lock (commit or abort)
    pub fn release(&self, txn_id: TransactionId) -> Result<()> {
        // lock order: declaring, then published
        let mut declaring = self.declaring.write();
        let mut published = self.published.write();
        let was_declaring = declaring.remove(&txn_id).is_some();
        let was_published = published.remove(&txn_id).is_some();

        if !was_declaring && !was_published {
            return Err(PredicateError::UnknownTransaction(txn_id));
        }

        debug!(txn_id, "predicate lock released");
        Ok(())
    }

    /// The published lock of a transaction
    pub fn get_lock(&self, txn_id: TransactionId) -> Option<Arc<PredicateLock>> {
        self.published.read().get(&txn_id).cloned()
    }

    /// Number of live transactions, declaring or published
    pub fn active_count(&self) -> usize {
        let declaring = self.declaring.read();
        declaring.len() + self.published.read().len()
    }

    fn with_declaring<T>(
        &self,
        txn_id: TransactionId,
        f: impl FnOnce(&mut PredicateLock) -> Result<T>,
    ) -> Result<T> {
        let mut declaring = self.declaring.write();
        match declaring.get_mut(&txn_id) {
            Some(lock) => f(lock),
            None if self.published.read().contains_key(&txn_id) => {
                Err(PredicateError::AlreadyPublished(txn_id))
            }
            None => Err(PredicateError::UnknownTransaction(txn_id)),
        }
    }

    fn conflicts_among(
        &self,
        txn_id: TransactionId,
        lock: &PredicateLock,
        published: &HashMap<TransactionId, Arc<PredicateLock>>,
    ) -> Result<Vec<TransactionId>> {
        let mut conflicts = Vec::new();
        for (&other_id, other) in published {
            if other_id == txn_id {
                continue;
            }
            if lock.intersects_with_policy(other, self.config.conflict_policy)? {
                conflicts.push(other_id);
            }
        }
        conflicts.sort_unstable();

        if !conflicts.is_empty() {
            debug!(txn_id, ?conflicts, "conflicting transactions");
        }
        Ok(conflicts)
    }
}

impl Default for PredicateLockTable {
    fn default() -> Self {
        Self::new()
    }
}
