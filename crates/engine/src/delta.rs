//! Delta MVCC engine
//!
//! Composes the delta store (one live record per key, history in per-writer
//! undo chains), the lock manager, and the transaction-info snapshot with a
//! commit watermark. Each commit advances the watermark, stamps the
//! writer's undo chain with it, and sweeps the purge-candidate list:
//! a chain is dropped once no active transaction began before its commit.
//!
//! As in the append-only variant, every state mutation happens under one
//! engine mutex that is never held across a lock-manager wait.

use std::sync::Arc;
use std::time::Duration;

use mvkv_concurrency::LockManager;
use mvkv_core::{CommitNo, Engine, Error, IsolationLevel, Result, Tx, TxId};
use mvkv_storage::{DeltaStore, TxInfo};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct DeltaState {
    store: DeltaStore,
    info: TxInfo,
    last_tx_id: TxId,
    last_commit_no: CommitNo,
    /// Committed writers whose undo chains are still around, in commit
    /// order. Swept on every commit so the list cannot grow unbounded when
    /// the watermark advances in bursts.
    purge_candidates: Vec<TxId>,
    purged_since_gc: usize,
}

impl DeltaState {
    /// Drop every candidate chain whose commit predates all active
    /// transactions; keep the rest for a later re-test.
    fn sweep_purge_list(&mut self) {
        let DeltaState {
            store,
            info,
            purge_candidates,
            purged_since_gc,
            ..
        } = self;

        let watermark = info.min_commit_no();
        purge_candidates.retain(|&tx| {
            if store.undo_log().commit_no(tx) <= watermark {
                store.undo_log_mut().delete(tx);
                *purged_since_gc += 1;
                trace!(tx, watermark, "purged undo chain");
                false
            } else {
                true
            }
        });
    }
}

#[derive(Debug)]
struct DeltaInner {
    state: Mutex<DeltaState>,
    locks: LockManager,
}

/// MVCC engine over a delta store with undo chains.
#[derive(Debug)]
pub struct DeltaEngine {
    inner: Arc<DeltaInner>,
}

impl Default for DeltaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaEngine {
    /// Create an empty engine with the default lock timeout.
    pub fn new() -> Self {
        Self::with_lock_manager(LockManager::new())
    }

    /// Create an empty engine with a custom lock-acquisition timeout.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::with_lock_manager(LockManager::with_timeout(timeout))
    }

    fn with_lock_manager(locks: LockManager) -> Self {
        DeltaEngine {
            inner: Arc::new(DeltaInner {
                state: Mutex::new(DeltaState::default()),
                locks,
            }),
        }
    }

    /// Sweep the purge list once more and report reclamation statistics.
    ///
    /// Returns `(pending, removed)`: chains still waiting on an eligible
    /// watermark, and chains removed since the previous `gc` call
    /// (including by the commit-time sweeps in between).
    pub fn gc(&self) -> (usize, usize) {
        let mut state = self.inner.state.lock();
        state.sweep_purge_list();

        let removed = state.purged_since_gc;
        state.purged_since_gc = 0;
        (state.purge_candidates.len(), removed)
    }
}

impl Engine for DeltaEngine {
    type Tx = DeltaTx;

    fn begin(&self, level: IsolationLevel) -> DeltaTx {
        let mut state = self.inner.state.lock();
        state.last_tx_id += 1;
        let id = state.last_tx_id;
        let observed = state.last_commit_no;
        state.info.register(id, observed);
        debug!(id, ?level, observed, "begin");

        DeltaTx {
            inner: Arc::clone(&self.inner),
            id,
            level,
            locked: FxHashSet::default(),
            info: state.info.clone(),
        }
    }
}

/// Handle on the delta MVCC engine.
///
/// There is no abort: a handle that times out on `set` stays active and
/// may retry or commit. Versions written by a handle that is simply
/// dropped stay in the store but never become visible to others.
#[derive(Debug)]
pub struct DeltaTx {
    inner: Arc<DeltaInner>,
    id: TxId,
    level: IsolationLevel,
    locked: FxHashSet<String>,
    info: TxInfo,
}

impl DeltaTx {
    /// This transaction's id.
    pub fn id(&self) -> TxId {
        self.id
    }
}

impl Tx for DeltaTx {
    fn get(&mut self, key: &str) -> Result<String> {
        let state = self.inner.state.lock();

        if self.level == IsolationLevel::ReadCommitted {
            self.info = state.info.clone();
        }

        state
            .store
            .get(key, self.id, &self.info)
            .ok_or(Error::NotFound)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // Lock first: the engine mutex must not be held across this wait.
        self.inner
            .locks
            .exclusive_lock(self.id, key)
            .map_err(|e| Error::lock("exclusive lock", e))?;
        self.locked.insert(key.to_owned());

        self.inner.state.lock().store.set(key, value, self.id);
        Ok(())
    }

    fn commit(self) -> Result<()> {
        for key in &self.locked {
            self.inner
                .locks
                .unlock(self.id, key)
                .map_err(|e| Error::lock("unlock", e))?;
        }

        // Watermark advance, chain stamp, unregistration, and purge all
        // happen under one critical section.
        let mut state = self.inner.state.lock();
        state.last_commit_no += 1;
        let commit_no = state.last_commit_no;

        state.store.undo_log_mut().set_commit_no(self.id, commit_no);
        state.info.unregister(self.id, commit_no);

        if state.store.undo_log().contains(self.id) {
            state.purge_candidates.push(self.id);
        }
        state.sweep_purge_list();

        debug!(id = self.id, commit_no, "commit");
        Ok(())
    }
}
