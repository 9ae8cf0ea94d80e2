//! Core vocabulary for mvkv
//!
//! This crate defines the shared types every layer speaks:
//! - Transaction and commit identifiers (`TxId`, `CommitNo`)
//! - Isolation levels
//! - The error model (`Error`, `LockError`, `Result`)
//! - The `Engine`/`Tx` traits that all four engine variants implement
//!
//! Upper crates (storage, concurrency, engine) depend only on this
//! vocabulary, so engine variants stay swappable behind one interface.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, LockError, Result};
pub use traits::{Engine, Tx};
pub use types::{CommitNo, IsolationLevel, TxId, NO_COMMIT, NO_TX};
