//! Locking engine: strict two-phase locking, no versions
//!
//! Reads take a shared lock, writes take an exclusive lock, and everything
//! is held until commit. Readers therefore block behind writers (and time
//! out if a writer sits on a key too long), which is exactly the
//! serialized behavior the conformance matrix expects from this variant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mvkv_concurrency::LockManager;
use mvkv_core::{Engine, Error, IsolationLevel, Result, Tx, TxId};
use mvkv_storage::KvTable;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

#[derive(Debug)]
struct LockingInner {
    table: Mutex<KvTable>,
    locks: LockManager,
    next_tx_id: AtomicU64,
}

/// Strict-locking engine.
#[derive(Debug)]
pub struct LockingEngine {
    inner: Arc<LockingInner>,
}

impl Default for LockingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LockingEngine {
    /// Create an empty engine with the default lock timeout.
    pub fn new() -> Self {
        Self::with_lock_manager(LockManager::new())
    }

    /// Create an empty engine with a custom lock-acquisition timeout.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::with_lock_manager(LockManager::with_timeout(timeout))
    }

    fn with_lock_manager(locks: LockManager) -> Self {
        LockingEngine {
            inner: Arc::new(LockingInner {
                table: Mutex::new(KvTable::new()),
                locks,
                next_tx_id: AtomicU64::new(0),
            }),
        }
    }

    /// Reclamation statistics. This variant keeps no versions, so there is
    /// never anything to reclaim.
    pub fn gc(&self) -> (usize, usize) {
        (0, 0)
    }
}

impl Engine for LockingEngine {
    type Tx = LockingTx;

    fn begin(&self, _level: IsolationLevel) -> LockingTx {
        let id = self.inner.next_tx_id.fetch_add(1, Ordering::SeqCst) + 1;

        LockingTx {
            inner: Arc::clone(&self.inner),
            id,
            locked: FxHashSet::default(),
        }
    }
}

/// Handle on the locking engine.
///
/// Holds every lock it acquires until `commit`. A timed-out acquisition
/// leaves the transaction active with its existing locks intact.
#[derive(Debug)]
pub struct LockingTx {
    inner: Arc<LockingInner>,
    id: TxId,
    locked: FxHashSet<String>,
}

impl LockingTx {
    /// This transaction's id.
    pub fn id(&self) -> TxId {
        self.id
    }
}

impl Tx for LockingTx {
    fn get(&mut self, key: &str) -> Result<String> {
        self.inner
            .locks
            .shared_lock(self.id, key)
            .map_err(|e| Error::lock("shared lock", e))?;
        self.locked.insert(key.to_owned());

        self.inner
            .table
            .lock()
            .get(key)
            .map(str::to_owned)
            .ok_or(Error::NotFound)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.inner
            .locks
            .exclusive_lock(self.id, key)
            .map_err(|e| Error::lock("exclusive lock", e))?;
        self.locked.insert(key.to_owned());

        self.inner.table.lock().set(key, value);
        Ok(())
    }

    fn commit(self) -> Result<()> {
        for key in &self.locked {
            self.inner
                .locks
                .unlock(self.id, key)
                .map_err(|e| Error::lock("unlock", e))?;
        }
        Ok(())
    }
}
