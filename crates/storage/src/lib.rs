//! Version stores for mvkv
//!
//! This crate implements the storage side of every engine variant:
//! - `TxInfo`: the transaction-info snapshot and the visibility predicate
//! - `KvTable`: single value per key, for the naive and locking engines
//! - `AppendOnlyStore`: one row appended per write, vacuum reclamation
//! - `UndoLog`: per-writer chains of prior record images
//! - `DeltaStore`: one live record per key, history through the undo log
//!
//! The two MVCC stores share the same visibility rule: a version is judged
//! solely by its writer's id against the reader's snapshot, never by who
//! superseded it. Reclamation (vacuum for append-only, purge for delta)
//! lives here too; the engines decide when to run it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append;
pub mod delta;
pub mod kv;
pub mod snapshot;
pub mod undo;

pub use append::{AppendOnlyStore, VacuumStats};
pub use delta::DeltaStore;
pub use kv::KvTable;
pub use snapshot::{is_visible, TxInfo};
pub use undo::{RecordImage, UndoLog, UndoPtr};
