//! Two-phase lock manager
//!
//! One monitor (mutex + condition variable) guards the whole lock table, a
//! map of `key → (owner → mode)`. Acquisitions wait on the condition
//! variable with a bounded budget; the last unlock of a key broadcasts and
//! every waiter re-checks its compatibility predicate, so exactly one
//! waiter wins an exclusive race and the rest resume waiting.
//!
//! Compatibility across distinct transactions:
//!
//! | holder \ requester | shared | exclusive |
//! |---|---|---|
//! | (none) | grant | grant |
//! | shared | grant | wait |
//! | exclusive | wait | wait |
//!
//! Same-transaction requests are always granted: exclusive subsumes shared
//! for the owner, and a shared holder may upgrade once no peer holds the
//! key. No starvation guarantee exists beyond the timeout bound, and
//! deadlocks are broken by timeout alone.

use std::time::{Duration, Instant};

use mvkv_core::{LockError, TxId};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Bound on every lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Mode of a held lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Compatible with other shared holders.
    Shared,
    /// Excludes every other transaction.
    Exclusive,
}

type LockTable = FxHashMap<String, FxHashMap<TxId, LockMode>>;

/// Per-key shared/exclusive lock manager with timeout.
#[derive(Debug)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    timeout: Duration,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    /// Create a manager with the default 100 ms acquisition timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create a manager with a custom acquisition timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        LockManager {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Acquire a shared lock on `key` for `tx`.
    ///
    /// Returns immediately if `tx` already holds any lock on `key`
    /// (exclusive subsumes shared for the owner). Otherwise waits until no
    /// other transaction holds exclusive.
    ///
    /// # Errors
    ///
    /// `LockError::Timeout` when the acquisition budget runs out. No state
    /// is mutated on timeout.
    pub fn shared_lock(&self, tx: TxId, key: &str) -> Result<(), LockError> {
        let mut table = self.table.lock();

        if table.get(key).is_some_and(|owners| owners.contains_key(&tx)) {
            return Ok(());
        }

        let deadline = Instant::now() + self.timeout;
        while other_holds_exclusive(&table, tx, key) {
            if Instant::now() >= deadline {
                trace!(tx, key, "shared lock timed out");
                return Err(LockError::Timeout);
            }
            self.released.wait_until(&mut table, deadline);
        }

        table
            .entry(key.to_owned())
            .or_default()
            .insert(tx, LockMode::Shared);

        Ok(())
    }

    /// Acquire an exclusive lock on `key` for `tx`.
    ///
    /// Returns immediately if `tx` already holds exclusive. A shared holder
    /// upgrades by waiting until no *other* transaction holds anything; the
    /// upgrade overwrites the owner's shared entry.
    ///
    /// # Errors
    ///
    /// `LockError::Timeout` when the acquisition budget runs out. No state
    /// is mutated on timeout; an upgrading holder keeps its shared lock.
    pub fn exclusive_lock(&self, tx: TxId, key: &str) -> Result<(), LockError> {
        let mut table = self.table.lock();

        if table
            .get(key)
            .and_then(|owners| owners.get(&tx))
            .is_some_and(|mode| *mode == LockMode::Exclusive)
        {
            return Ok(());
        }

        let deadline = Instant::now() + self.timeout;
        while other_holds_any(&table, tx, key) {
            if Instant::now() >= deadline {
                trace!(tx, key, "exclusive lock timed out");
                return Err(LockError::Timeout);
            }
            self.released.wait_until(&mut table, deadline);
        }

        table
            .entry(key.to_owned())
            .or_default()
            .insert(tx, LockMode::Exclusive);

        Ok(())
    }

    /// Release `tx`'s lock on `key`.
    ///
    /// When the last holder of a key releases, every waiter is woken; each
    /// re-checks its predicate and exactly one exclusive requester wins.
    ///
    /// # Errors
    ///
    /// `LockError::NotLocked` when `tx` holds nothing on `key`.
    pub fn unlock(&self, tx: TxId, key: &str) -> Result<(), LockError> {
        let mut table = self.table.lock();

        let Some(owners) = table.get_mut(key) else {
            return Err(LockError::NotLocked);
        };

        if owners.remove(&tx).is_none() {
            return Err(LockError::NotLocked);
        }

        if owners.is_empty() {
            table.remove(key);
            trace!(tx, key, "key fully released, waking waiters");
            self.released.notify_all();
        }

        Ok(())
    }

    /// Mode `tx` currently holds on `key`, if any.
    pub fn held(&self, tx: TxId, key: &str) -> Option<LockMode> {
        self.table
            .lock()
            .get(key)
            .and_then(|owners| owners.get(&tx))
            .copied()
    }

    /// Number of keys with at least one holder.
    pub fn locked_key_count(&self) -> usize {
        self.table.lock().len()
    }
}

/// Does a transaction other than `tx` hold exclusive on `key`?
fn other_holds_exclusive(table: &LockTable, tx: TxId, key: &str) -> bool {
    let Some(owners) = table.get(key) else {
        return false;
    };

    // 0 holders: free. 2+ holders: all shared, since exclusive admits no
    // peer. Only a lone holder can be an exclusive other.
    owners.len() == 1
        && owners
            .iter()
            .any(|(&owner, &mode)| owner != tx && mode == LockMode::Exclusive)
}

/// Does a transaction other than `tx` hold anything on `key`?
fn other_holds_any(table: &LockTable, tx: TxId, key: &str) -> bool {
    let Some(owners) = table.get(key) else {
        return false;
    };

    if owners.is_empty() {
        return false;
    }

    !(owners.len() == 1 && owners.contains_key(&tx))
}
