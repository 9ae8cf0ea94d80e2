//! # mvkv
//!
//! An in-memory key/value store that demonstrates four transaction
//! isolation strategies side-by-side behind one transactional interface:
//!
//! | Engine | Strategy | Anomalies |
//! |--------|----------|-----------|
//! | [`NaiveEngine`] | direct read/write | dirty reads |
//! | [`LockingEngine`] | strict two-phase locking | readers block |
//! | [`AppendOnlyEngine`] | MVCC, append-only versions | none at its level |
//! | [`DeltaEngine`] | MVCC, undo-log deltas | none at its level |
//!
//! The MVCC engines support [`IsolationLevel::ReadCommitted`] (re-snapshot
//! on every read) and [`IsolationLevel::RepeatableRead`] (snapshot frozen
//! at begin), and reclaim dead versions through `gc()` (vacuum for the
//! append-only store, undo-chain purge for the delta store).
//!
//! # Quick Start
//!
//! ```
//! use mvkv::{DeltaEngine, Engine, IsolationLevel, Tx};
//!
//! fn main() -> mvkv::Result<()> {
//!     let engine = DeltaEngine::new();
//!
//!     let mut tx = engine.begin(IsolationLevel::RepeatableRead);
//!     tx.set("user:name", "alice")?;
//!     assert_eq!(tx.get("user:name")?, "alice");
//!     tx.commit()?;
//!
//!     let mut reader = engine.begin(IsolationLevel::ReadCommitted);
//!     assert_eq!(reader.get("user:name")?, "alice");
//!     reader.commit()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency model
//!
//! Engines are `Sync`: share one by reference (or `Arc`) and open handles
//! from any thread. A handle itself is single-threaded. The only blocking
//! point anywhere is lock acquisition, bounded by
//! [`DEFAULT_LOCK_TIMEOUT`]; a timed-out `set` leaves the transaction
//! active with no partial state. There is no abort or rollback.
//!
//! Internal crates (storage, concurrency, engine) are not exposed; only
//! the surface re-exported here is stable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use mvkv_core::{
    CommitNo, Engine, Error, IsolationLevel, LockError, Result, Tx, TxId,
};

pub use mvkv_concurrency::{LockManager, LockMode, DEFAULT_LOCK_TIMEOUT};

pub use mvkv_engine::{
    AppendOnlyEngine, AppendOnlyTx, DeltaEngine, DeltaTx, LockingEngine, LockingTx, NaiveEngine,
    NaiveTx,
};
