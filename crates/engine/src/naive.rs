//! Naive engine: no locks, no versions
//!
//! Every handle reads and writes the shared table directly, so concurrent
//! transactions observe each other's uncommitted writes. The dirty reads
//! are the point: this variant anchors the bottom of the conformance
//! matrix. The table sits behind a mutex only for memory safety; each
//! operation locks independently, providing no isolation whatsoever.

use std::sync::Arc;

use mvkv_core::{Engine, Error, IsolationLevel, Result, Tx};
use mvkv_storage::KvTable;
use parking_lot::Mutex;

/// Lock-free, version-free engine.
#[derive(Debug, Default)]
pub struct NaiveEngine {
    table: Arc<Mutex<KvTable>>,
}

impl NaiveEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for NaiveEngine {
    type Tx = NaiveTx;

    fn begin(&self, _level: IsolationLevel) -> NaiveTx {
        NaiveTx {
            table: Arc::clone(&self.table),
        }
    }
}

/// Handle on the naive engine.
#[derive(Debug)]
pub struct NaiveTx {
    table: Arc<Mutex<KvTable>>,
}

impl Tx for NaiveTx {
    fn get(&mut self, key: &str) -> Result<String> {
        self.table
            .lock()
            .get(key)
            .map(str::to_owned)
            .ok_or(Error::NotFound)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.table.lock().set(key, value);
        Ok(())
    }

    fn commit(self) -> Result<()> {
        Ok(())
    }
}
