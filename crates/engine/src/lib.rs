//! Transaction engines for mvkv
//!
//! Four variants of the same `Engine`/`Tx` interface, in increasing order
//! of sophistication:
//! - `NaiveEngine`: no locks, no versions; dirty reads by design
//! - `LockingEngine`: strict two-phase locking over a single-value table
//! - `AppendOnlyEngine`: MVCC over an append-only version store, with
//!   vacuum reclamation
//! - `DeltaEngine`: MVCC over a delta store with per-writer undo chains,
//!   commit watermark, and undo purge
//!
//! The MVCC engines keep all global state (store, id counter, transaction
//! info, purge bookkeeping) behind one mutex, taken whole for every state
//! mutation and never held across a lock-manager wait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append;
pub mod delta;
pub mod locking;
pub mod naive;

pub use append::{AppendOnlyEngine, AppendOnlyTx};
pub use delta::{DeltaEngine, DeltaTx};
pub use locking::{LockingEngine, LockingTx};
pub use naive::{NaiveEngine, NaiveTx};
