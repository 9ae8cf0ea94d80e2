//! Delta version store
//!
//! The main table holds exactly one live record per key. Overwriting a key
//! pushes the prior image into the *writer's* undo chain and links the new
//! live record back to it, so each key's history is a temporal stack rooted
//! at the live version. `prev` links are never mutated after creation.
//!
//! Reads locate the live record and walk backward until a visible image is
//! found; reaching a sentinel (the reserved root of a key's first version)
//! or a purged chain means the key did not exist for that reader.

use crate::snapshot::{is_visible, TxInfo};
use crate::undo::{RecordImage, UndoLog};
use mvkv_core::TxId;
use rustc_hash::FxHashMap;
use tracing::trace;

/// One live record per key, with history in the undo log.
#[derive(Debug, Default)]
pub struct DeltaStore {
    records: FxHashMap<String, RecordImage>,
    undo: UndoLog,
}

impl DeltaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` for `key` as transaction `tx`.
    pub fn set(&mut self, key: &str, value: &str, tx: TxId) {
        if let Some(live) = self.records.get_mut(key) {
            if live.tx == tx {
                trace!(key, tx, "updating own live record in place");
                live.value = value.to_owned();
                return;
            }

            // Push the prior image under the overwriter's chain and install
            // the new live record pointing back at it.
            let prior = live.clone();
            let ptr = self.undo.append(tx, Some(prior));
            trace!(key, tx, ?ptr, "pushed prior image to undo log");

            *live = RecordImage {
                key: key.to_owned(),
                value: value.to_owned(),
                tx,
                prev: Some(ptr),
            };
            return;
        }

        // First-ever version of the key: reserve a sentinel root so the
        // visibility walk has somewhere definite to end.
        let ptr = self.undo.append(tx, None);
        self.records.insert(
            key.to_owned(),
            RecordImage {
                key: key.to_owned(),
                value: value.to_owned(),
                tx,
                prev: Some(ptr),
            },
        );
        trace!(key, tx, "inserted first version");
    }

    /// Value of `key` visible to `reader` under `info`.
    pub fn get(&self, key: &str, reader: TxId, info: &TxInfo) -> Option<String> {
        let live = self.records.get(key)?;

        if is_visible(live.tx, reader, info) {
            return Some(live.value.clone());
        }

        // Walk the temporal stack toward older images.
        let mut ptr = live.prev;
        while let Some(p) = ptr {
            let image = match self.undo.get(p) {
                Some(image) => image,
                // Sentinel root or purged chain: no version existed for
                // this reader.
                None => return None,
            };

            if is_visible(image.tx, reader, info) {
                return Some(image.value.clone());
            }

            ptr = image.prev;
        }

        None
    }

    /// The undo log backing this store.
    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    /// Mutable access to the undo log, for commit stamping and purge.
    pub fn undo_log_mut(&mut self) -> &mut UndoLog {
        &mut self.undo
    }

    /// Number of keys with a live record.
    pub fn key_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvkv_core::NO_COMMIT;

    fn committed_info() -> TxInfo {
        TxInfo::new()
    }

    // === Write Path Tests ===

    #[test]
    fn test_first_write_reserves_sentinel() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);

        assert_eq!(store.key_count(), 1);
        // The writer's chain holds exactly the sentinel root.
        assert!(store.undo_log().contains(1));
    }

    #[test]
    fn test_rewrite_by_same_tx_updates_in_place() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);
        store.set("a", "2", 1);

        assert_eq!(store.get("a", 1, &committed_info()), Some("2".to_owned()));
        // No extra undo images beyond the sentinel root.
        assert_eq!(store.undo_log().len(), 1);
    }

    #[test]
    fn test_overwrite_pushes_prior_image() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);
        store.set("a", "2", 2);

        // Writer 2's chain now carries writer 1's image.
        assert!(store.undo_log().contains(2));
        assert_eq!(store.get("a", 3, &committed_info()), Some("2".to_owned()));
    }

    // === Read Path Tests ===

    #[test]
    fn test_get_missing_key() {
        let store = DeltaStore::new();
        assert_eq!(store.get("a", 1, &committed_info()), None);
    }

    #[test]
    fn test_walk_past_invisible_live_record() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);

        let mut info = TxInfo::new();
        info.register(2, NO_COMMIT);
        store.set("a", "2", 2);

        // Writer 2 is active: reader 3 walks back to writer 1's image.
        assert_eq!(store.get("a", 3, &info), Some("1".to_owned()));
    }

    #[test]
    fn test_walk_past_future_live_record() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);
        store.set("a", "2", 5);

        // Reader 3 predates writer 5.
        assert_eq!(store.get("a", 3, &committed_info()), Some("1".to_owned()));
    }

    #[test]
    fn test_sentinel_means_key_did_not_exist_yet() {
        let mut store = DeltaStore::new();

        let mut info = TxInfo::new();
        info.register(2, NO_COMMIT);
        store.set("a", "2", 2);

        // The only version was written by the still-active 2: reader 3
        // reaches the sentinel and finds nothing.
        assert_eq!(store.get("a", 3, &info), None);
    }

    #[test]
    fn test_own_uncommitted_write_is_read_back() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);

        let mut info = TxInfo::new();
        info.register(2, NO_COMMIT);
        store.set("a", "2", 2);

        assert_eq!(store.get("a", 2, &info), Some("2".to_owned()));
    }

    #[test]
    fn test_chain_across_three_writers() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);
        store.set("a", "2", 2);

        let mut info = TxInfo::new();
        info.register(3, NO_COMMIT);
        info.register(4, NO_COMMIT);
        store.set("a", "3", 3);

        // Reader 4's snapshot has writer 3 active: the walk passes the live
        // record and lands on writer 2's image.
        assert_eq!(store.get("a", 4, &info), Some("2".to_owned()));
    }

    #[test]
    fn test_purged_chain_reads_as_absent() {
        let mut store = DeltaStore::new();
        store.set("a", "1", 1);
        store.set("a", "2", 2);

        // Purge writer 2's chain, then ask with a snapshot that cannot see
        // the live record. The walk hits the missing chain and gives up.
        store.undo_log_mut().delete(2);

        let mut info = TxInfo::new();
        info.register(2, NO_COMMIT);
        assert_eq!(store.get("a", 3, &info), None);
    }
}
