//! Append-only version store
//!
//! Every write appends a new row; nothing is ever rewritten except two
//! narrow cases:
//! - a writer re-setting a key it already wrote in the same transaction
//!   overwrites its own in-progress row's value, and
//! - the previously live row gets its `end_tx` stamped exactly once
//!   (zero → the superseding writer's id) when a new version lands.
//!
//! Reads scan front to back and keep the *last* visible match. Visibility
//! is a function of `begin_tx` and the reader's snapshot only; `end_tx`
//! exists purely so vacuum can tell reclaimable rows apart. Consulting it
//! during reads would change behavior whenever a superseding writer is
//! still invisible.

use crate::snapshot::{is_visible, TxInfo};
use mvkv_core::{TxId, NO_TX};
use tracing::{debug, trace};

/// One version of one key.
#[derive(Debug, Clone)]
pub struct VersionRecord {
    key: String,
    value: String,
    /// Writer that produced this version.
    begin_tx: TxId,
    /// Writer that superseded this version; `NO_TX` while live.
    end_tx: TxId,
}

impl VersionRecord {
    /// Writer that produced this version.
    pub fn begin_tx(&self) -> TxId {
        self.begin_tx
    }

    /// Writer that superseded this version (`NO_TX` while live).
    pub fn end_tx(&self) -> TxId {
        self.end_tx
    }

    /// Whether this is the live version of its key.
    pub fn is_live(&self) -> bool {
        self.end_tx == NO_TX
    }
}

/// Counts reported by one vacuum pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VacuumStats {
    /// Superseded rows kept because the superseding writer is still active.
    pub kept_active: usize,
    /// Superseded rows reclaimed.
    pub removed: usize,
}

/// Append-ordered sequence of version records.
#[derive(Debug, Default)]
pub struct AppendOnlyStore {
    records: Vec<VersionRecord>,
}

impl AppendOnlyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key` visible to `reader` under `info`.
    ///
    /// Scans every version of the key and returns the last visible one, so
    /// a superseded version still wins while its successor is filtered out
    /// as future or active.
    pub fn get(&self, key: &str, reader: TxId, info: &TxInfo) -> Option<String> {
        let mut found = None;

        for record in &self.records {
            if record.key != key {
                continue;
            }

            if !is_visible(record.begin_tx, reader, info) {
                continue;
            }

            found = Some(&record.value);
        }

        found.cloned()
    }

    /// Write `value` for `key` as transaction `tx`.
    pub fn set(&mut self, key: &str, value: &str, tx: TxId) {
        // The writer's own in-progress version is updated in place; the
        // version chain records one row per key per transaction.
        if let Some(own) = self
            .records
            .iter_mut()
            .find(|r| r.key == key && r.begin_tx == tx)
        {
            trace!(key, tx, "updating own in-progress version in place");
            own.value = value.to_owned();
            return;
        }

        // Stamp the live predecessor, if any, exactly once.
        if let Some(live) = self
            .records
            .iter_mut()
            .find(|r| r.key == key && r.end_tx == NO_TX)
        {
            live.end_tx = tx;
        }

        self.records.push(VersionRecord {
            key: key.to_owned(),
            value: value.to_owned(),
            begin_tx: tx,
            end_tx: NO_TX,
        });
    }

    /// Reclaim superseded rows no longer needed by any snapshot.
    ///
    /// Must be called with the engine's *global* `TxInfo`. A row is removed
    /// when it has been superseded (`end_tx != NO_TX`) and the superseding
    /// writer is no longer active; live rows are always kept.
    pub fn vacuum(&mut self, info: &TxInfo) -> VacuumStats {
        let mut stats = VacuumStats::default();

        self.records.retain(|record| {
            if record.end_tx == NO_TX {
                return true;
            }

            if info.is_active(record.end_tx) {
                stats.kept_active += 1;
                return true;
            }

            stats.removed += 1;
            false
        });

        debug!(
            kept_active = stats.kept_active,
            removed = stats.removed,
            "vacuum pass"
        );

        stats
    }

    /// Total number of version rows currently stored.
    pub fn version_count(&self) -> usize {
        self.records.len()
    }

    /// All versions of `key`, in append order.
    pub fn versions_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a VersionRecord> {
        self.records.iter().filter(move |r| r.key == key)
    }
}
