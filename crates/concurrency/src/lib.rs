//! Concurrency layer for mvkv
//!
//! This crate implements the two-phase lock manager used by the locking
//! and MVCC engines:
//! - Shared/exclusive modes per key
//! - Self-reentry (exclusive subsumes shared for the owner)
//! - Lock upgrade, blocking on peer sharers
//! - Bounded waiting with a global timeout
//! - Broadcast wake-up on full release of a key
//!
//! Deadlocks are resolved by timeout alone; there is no waits-for graph.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;

pub use manager::{LockManager, LockMode, DEFAULT_LOCK_TIMEOUT};
