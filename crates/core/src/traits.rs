//! The engine seam
//!
//! `Engine` and `Tx` are the one interface all four variants (naive,
//! locking, append-only MVCC, delta MVCC) implement, so conformance tests
//! can drive any of them with the same script.
//!
//! A handle is single-threaded: it is not safe to share one `Tx` between
//! threads, but distinct handles from the same engine proceed in parallel
//! (hence `Engine: Sync`, `Tx: Send`).

use crate::error::Result;
use crate::types::IsolationLevel;

/// A transactional key/value engine.
pub trait Engine: Send + Sync {
    /// Transaction handle type produced by [`Engine::begin`].
    type Tx: Tx;

    /// Open a new transaction at the given isolation level.
    ///
    /// Mints a fresh transaction id and, for MVCC variants, registers it in
    /// the engine's active set and captures the handle's snapshot. Variants
    /// without snapshots ignore `level`.
    fn begin(&self, level: IsolationLevel) -> Self::Tx;
}

/// A transaction handle.
///
/// Handles move through `Active` (any number of `get`/`set`) to the
/// terminal `Committed` state; `commit` consumes the handle because there
/// is no abort or rollback to bring it back.
pub trait Tx: Send {
    /// Read the value visible to this transaction.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no version of `key` is visible.
    /// Locking variants may also return a wrapped lock timeout.
    fn get(&mut self, key: &str) -> Result<String>;

    /// Write a value.
    ///
    /// Acquires an exclusive lock on `key` first (where the variant locks
    /// at all); the lock is held until `commit`.
    ///
    /// # Errors
    ///
    /// A wrapped `LockError::Timeout` when the lock cannot be acquired in
    /// time. The transaction stays active and holds whatever it already
    /// held; the caller may retry or commit.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Commit: release every held lock and unregister from the engine.
    ///
    /// # Errors
    ///
    /// A wrapped `LockError::NotLocked` if the handle's locked-key set is
    /// inconsistent with the lock manager.
    fn commit(self) -> Result<()>;
}
