//! Append-only MVCC engine
//!
//! Composes the append-only version store, the lock manager, and the
//! transaction-info snapshot. Readers never block: `get` judges versions
//! against the handle's snapshot, which is frozen at begin under
//! `RepeatableRead` and refreshed per read under `ReadCommitted`. Writers
//! serialize per key through exclusive locks.
//!
//! All engine-global state lives in one mutex-guarded struct; `set`
//! acquires its lock *before* touching that mutex, so the engine lock is
//! never held across a lock-manager wait.

use std::sync::Arc;
use std::time::Duration;

use mvkv_concurrency::LockManager;
use mvkv_core::{Engine, Error, IsolationLevel, Result, Tx, TxId, NO_COMMIT};
use mvkv_storage::{AppendOnlyStore, TxInfo};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Default)]
struct AppendState {
    store: AppendOnlyStore,
    info: TxInfo,
    last_tx_id: TxId,
}

#[derive(Debug)]
struct AppendInner {
    state: Mutex<AppendState>,
    locks: LockManager,
}

/// MVCC engine over an append-only version store.
#[derive(Debug)]
pub struct AppendOnlyEngine {
    inner: Arc<AppendInner>,
}

impl Default for AppendOnlyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AppendOnlyEngine {
    /// Create an empty engine with the default lock timeout.
    pub fn new() -> Self {
        Self::with_lock_manager(LockManager::new())
    }

    /// Create an empty engine with a custom lock-acquisition timeout.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self::with_lock_manager(LockManager::with_timeout(timeout))
    }

    fn with_lock_manager(locks: LockManager) -> Self {
        AppendOnlyEngine {
            inner: Arc::new(AppendInner {
                state: Mutex::new(AppendState::default()),
                locks,
            }),
        }
    }

    /// Run a vacuum pass under the global snapshot.
    ///
    /// Returns `(kept_because_active, removed)`: superseded rows kept
    /// because their superseding writer is still active, and rows
    /// reclaimed.
    pub fn gc(&self) -> (usize, usize) {
        let mut state = self.inner.state.lock();
        let AppendState { store, info, .. } = &mut *state;
        let stats = store.vacuum(info);
        (stats.kept_active, stats.removed)
    }
}

impl Engine for AppendOnlyEngine {
    type Tx = AppendOnlyTx;

    fn begin(&self, level: IsolationLevel) -> AppendOnlyTx {
        let mut state = self.inner.state.lock();
        state.last_tx_id += 1;
        let id = state.last_tx_id;
        state.info.register(id, NO_COMMIT);
        debug!(id, ?level, "begin");

        AppendOnlyTx {
            inner: Arc::clone(&self.inner),
            id,
            level,
            locked: FxHashSet::default(),
            info: state.info.clone(),
        }
    }
}

/// Handle on the append-only MVCC engine.
///
/// There is no abort: a handle that times out on `set` stays active and
/// may retry or commit. Versions written by a handle that is simply
/// dropped stay in the store but never become visible to others.
#[derive(Debug)]
pub struct AppendOnlyTx {
    inner: Arc<AppendInner>,
    id: TxId,
    level: IsolationLevel,
    locked: FxHashSet<String>,
    info: TxInfo,
}

impl AppendOnlyTx {
    /// This transaction's id.
    pub fn id(&self) -> TxId {
        self.id
    }
}

impl Tx for AppendOnlyTx {
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

        let mut state = self.inner.state.lock();
        state.info.unregister(self.id, NO_COMMIT);
        debug!(id = self.id, "commit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(AppendOnlyEngine: Send, Sync);
    static_assertions::assert_impl_all!(AppendOnlyTx: Send);

    fn committed(engine: &AppendOnlyEngine, key: &str, value: &str) {
        let mut tx = engine.begin(IsolationLevel::ReadCommitted);
        tx.set(key, value).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn test_tx_ids_are_monotonic() {
        let engine = AppendOnlyEngine::new();

        let a = engine.begin(IsolationLevel::ReadCommitted);
        let b = engine.begin(IsolationLevel::ReadCommitted);

        assert!(a.id() < b.id());
    }

    #[test]
    fn test_get_missing_key() {
        let engine = AppendOnlyEngine::new();
        let mut tx = engine.begin(IsolationLevel::RepeatableRead);

        assert!(matches!(tx.get("k"), Err(Error::NotFound)));
    }

    #[test]
    fn test_read_your_writes_at_both_levels() {
        for level in [
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
        ] {
            let engine = AppendOnlyEngine::new();
            let mut tx = engine.begin(level);

            tx.set("k", "v").unwrap();
            assert_eq!(tx.get("k").unwrap(), "v");

            tx.set("k", "v2").unwrap();
            assert_eq!(tx.get("k").unwrap(), "v2");
        }
    }

    #[test]
    fn test_repeatable_read_freezes_snapshot_at_begin() {
        let engine = AppendOnlyEngine::new();
        committed(&engine, "k", "old");

        let mut reader = engine.begin(IsolationLevel::RepeatableRead);
        let mut writer = engine.begin(IsolationLevel::RepeatableRead);

        writer.set("k", "new").unwrap();
        assert_eq!(reader.get("k").unwrap(), "old");

        writer.commit().unwrap();
        // Still the begin-time view, even after the writer committed.
        assert_eq!(reader.get("k").unwrap(), "old");

        reader.commit().unwrap();
    }

    #[test]
    fn test_read_committed_observes_each_commit() {
        let engine = AppendOnlyEngine::new();
        committed(&engine, "k", "old");

        let mut reader = engine.begin(IsolationLevel::ReadCommitted);
        let mut writer = engine.begin(IsolationLevel::ReadCommitted);

        writer.set("k", "new").unwrap();
        // Uncommitted: not visible yet.
        assert_eq!(reader.get("k").unwrap(), "old");

        writer.commit().unwrap();
        assert_eq!(reader.get("k").unwrap(), "new");

        reader.commit().unwrap();
    }

    #[test]
    fn test_writers_conflict_on_same_key() {
        let engine = AppendOnlyEngine::with_lock_timeout(Duration::from_millis(20));

        let mut first = engine.begin(IsolationLevel::ReadCommitted);
        first.set("k", "1").unwrap();

        let mut second = engine.begin(IsolationLevel::ReadCommitted);
        assert!(second.set("k", "2").unwrap_err().is_timeout());

        first.commit().unwrap();
        second.set("k", "2").unwrap();
        second.commit().unwrap();
    }

    #[test]
    fn test_gc_reclaims_superseded_versions() {
        let engine = AppendOnlyEngine::new();
        committed(&engine, "k", "1");
        committed(&engine, "k", "2");
        committed(&engine, "k", "3");

        let (kept_active, removed) = engine.gc();
        assert_eq!(kept_active, 0);
        assert_eq!(removed, 2);

        // A second pass has nothing left to do.
        assert_eq!(engine.gc(), (0, 0));

        let mut reader = engine.begin(IsolationLevel::ReadCommitted);
        assert_eq!(reader.get("k").unwrap(), "3");
    }

    #[test]
    fn test_gc_spares_versions_needed_by_snapshots() {
        let engine = AppendOnlyEngine::new();
        committed(&engine, "k", "old");

        let mut reader = engine.begin(IsolationLevel::RepeatableRead);
        let mut writer = engine.begin(IsolationLevel::ReadCommitted);
        writer.set("k", "new").unwrap();

        // The old row is superseded, but its superseder is still active.
        let (kept_active, removed) = engine.gc();
        assert_eq!(kept_active, 1);
        assert_eq!(removed, 0);

        writer.commit().unwrap();
        assert_eq!(reader.get("k").unwrap(), "old");
        reader.commit().unwrap();
    }
}
