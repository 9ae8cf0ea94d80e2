//! Transaction-info snapshots and the visibility predicate
//!
//! A `TxInfo` captures which writers were active and what the commit
//! watermark looked like at a point in time. Each MVCC engine owns one
//! global instance, mutated only on `begin` and `commit`; every transaction
//! handle carries a clone of it. Under `RepeatableRead` the clone is frozen
//! for the handle's lifetime; under `ReadCommitted` it is replaced with a
//! fresh clone at the start of every read.
//!
//! # Visibility
//!
//! A version written by `writer` is visible to `reader` iff:
//! 1. `writer == reader` (own writes), or
//! 2. `writer < reader` and `writer` is not in the snapshot's active set.
//!
//! The predicate never consults who superseded a version. A superseded
//! record therefore stays readable through "last visible match wins"
//! scanning while its successor is filtered out as future or active.

use mvkv_core::{CommitNo, TxId, NO_TX};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Snapshot of the active-writer set and commit watermark.
///
/// The commit-number fields (`last_commit_nos`, `min_commit_no`) are only
/// meaningful to the delta engine; the append-only engine registers its
/// transactions with a zero watermark and never reads them.
#[derive(Debug, Clone, Default)]
pub struct TxInfo {
    /// Transactions currently active (begun, not yet committed).
    active_tx_ids: FxHashSet<TxId>,
    /// Minimum of `active_tx_ids`, `NO_TX` when the set is empty.
    min_tx_id: TxId,
    /// Commit watermark each active transaction observed at its begin.
    last_commit_nos: FxHashMap<TxId, CommitNo>,
    /// Minimum of `last_commit_nos`, or the latest commit number when no
    /// transaction is active.
    min_commit_no: CommitNo,
}

impl TxInfo {
    /// Create an empty snapshot: no active writers, no commits observed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tx` as active.
    ///
    /// `observed_commit_no` is the engine's commit watermark at begin time
    /// (always `NO_COMMIT` for the append-only engine). The minima are
    /// recomputed immediately so they hold at every instant, not just after
    /// commits.
    pub fn register(&mut self, tx: TxId, observed_commit_no: CommitNo) {
        self.active_tx_ids.insert(tx);
        self.last_commit_nos.insert(tx, observed_commit_no);
        self.recompute(observed_commit_no);
    }

    /// Remove `tx` from the active set at commit.
    ///
    /// `latest_commit_no` seeds `min_commit_no` when the active set drains:
    /// with nobody active, nothing older than the newest commit can ever be
    /// needed again.
    pub fn unregister(&mut self, tx: TxId, latest_commit_no: CommitNo) {
        self.active_tx_ids.remove(&tx);
        self.last_commit_nos.remove(&tx);
        self.recompute(latest_commit_no);
    }

    fn recompute(&mut self, latest_commit_no: CommitNo) {
        self.min_tx_id = self.active_tx_ids.iter().copied().min().unwrap_or(NO_TX);
        self.min_commit_no = self
            .last_commit_nos
            .values()
            .copied()
            .min()
            .unwrap_or(latest_commit_no);
    }

    /// Whether `tx` is active in this snapshot.
    pub fn is_active(&self, tx: TxId) -> bool {
        self.active_tx_ids.contains(&tx)
    }

    /// Number of active transactions.
    pub fn active_count(&self) -> usize {
        self.active_tx_ids.len()
    }

    /// Minimum active transaction id (`NO_TX` when none are active).
    pub fn min_tx_id(&self) -> TxId {
        self.min_tx_id
    }

    /// Commit watermark below which no active transaction started.
    ///
    /// Undo chains stamped with a commit number at or below this can no
    /// longer be reached by any current or future snapshot.
    pub fn min_commit_no(&self) -> CommitNo {
        self.min_commit_no
    }
}

/// Visibility of a version written by `writer` to `reader` under `info`.
pub fn is_visible(writer: TxId, reader: TxId, info: &TxInfo) -> bool {
    if writer == reader {
        // Own writes are always visible.
        return true;
    }

    if writer > reader {
        trace!(writer, reader, "not visible: created by a later transaction");
        return false;
    }

    if info.is_active(writer) {
        trace!(writer, reader, "not visible: writer still active");
        return false;
    }

    true
}
