//! Per-writer undo chains
//!
//! An arena of record images keyed by `(writer, slot)`. Chain links are the
//! same integer-pair handles, never heap back-pointers, so a whole writer's
//! chain can be dropped in one `delete` without touching anything that
//! points into it.
//!
//! A `None` slot is a *sentinel*: the root reserved when a key's first-ever
//! version is installed. It terminates a visibility walk as "not found" and
//! is distinct from a missing (purged) chain, which `get` also reports as
//! absent.

use mvkv_core::{CommitNo, TxId, NO_COMMIT};
use rustc_hash::FxHashMap;

/// Handle to one image in the undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoPtr {
    tx: TxId,
    slot: usize,
}

impl UndoPtr {
    /// Writer whose chain holds the image.
    pub fn tx(&self) -> TxId {
        self.tx
    }

    /// Position within that writer's chain.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// A record image: one version of a key, in the shape shared by the delta
/// store's live table and the undo chains hanging off it.
#[derive(Debug, Clone)]
pub struct RecordImage {
    /// Logical identity.
    pub key: String,
    /// Value of this version.
    pub value: String,
    /// Writer that produced this version.
    pub tx: TxId,
    /// Predecessor image, if the key existed before this version.
    pub prev: Option<UndoPtr>,
}

#[derive(Debug, Default)]
struct UndoChain {
    /// Commit number stamped when the writer commits; `NO_COMMIT` until then.
    commit_no: CommitNo,
    images: Vec<Option<RecordImage>>,
}

/// All writers' undo chains.
///
/// A chain grows only while its writer is active; after commit it is
/// addressable but immutable until purge drops it whole.
#[derive(Debug, Default)]
pub struct UndoLog {
    chains: FxHashMap<TxId, UndoChain>,
}

impl UndoLog {
    /// Create an empty undo log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `image` to `tx`'s chain, creating the chain if absent.
    ///
    /// Pass `None` to reserve a sentinel slot for a key's first version.
    pub fn append(&mut self, tx: TxId, image: Option<RecordImage>) -> UndoPtr {
        let chain = self.chains.entry(tx).or_default();
        chain.images.push(image);

        UndoPtr {
            tx,
            slot: chain.images.len() - 1,
        }
    }

    /// Image behind `ptr`.
    ///
    /// `None` when the slot is a sentinel or when the writer's chain has
    /// been purged; either way the visibility walk ends in "not found".
    pub fn get(&self, ptr: UndoPtr) -> Option<&RecordImage> {
        self.chains
            .get(&ptr.tx)
            .and_then(|chain| chain.images.get(ptr.slot))
            .and_then(|slot| slot.as_ref())
    }

    /// Stamp `tx`'s chain with its commit number.
    ///
    /// No-op when the writer has no chain (a read-only commit).
    pub fn set_commit_no(&mut self, tx: TxId, commit_no: CommitNo) {
        if let Some(chain) = self.chains.get_mut(&tx) {
            chain.commit_no = commit_no;
        }
    }

    /// Commit number stamped on `tx`'s chain (`NO_COMMIT` when absent or
    /// not yet committed).
    pub fn commit_no(&self, tx: TxId) -> CommitNo {
        self.chains
            .get(&tx)
            .map(|chain| chain.commit_no)
            .unwrap_or(NO_COMMIT)
    }

    /// Drop `tx`'s whole chain. Returns whether a chain existed.
    pub fn delete(&mut self, tx: TxId) -> bool {
        self.chains.remove(&tx).is_some()
    }

    /// Whether `tx` has a chain.
    pub fn contains(&self, tx: TxId) -> bool {
        self.chains.contains_key(&tx)
    }

    /// Number of writers with chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether no writer has a chain.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(key: &str, value: &str, tx: TxId) -> RecordImage {
        RecordImage {
            key: key.to_owned(),
            value: value.to_owned(),
            tx,
            prev: None,
        }
    }

    #[test]
    fn test_append_returns_sequential_slots() {
        let mut log = UndoLog::new();

        let p0 = log.append(1, Some(image("a", "1", 1)));
        let p1 = log.append(1, Some(image("a", "2", 1)));

        assert_eq!(p0.tx(), 1);
        assert_eq!(p0.slot(), 0);
        assert_eq!(p1.slot(), 1);
    }

    #[test]
    fn test_get_returns_appended_image() {
        let mut log = UndoLog::new();
        let ptr = log.append(3, Some(image("a", "old", 2)));

        let found = log.get(ptr).unwrap();
        assert_eq!(found.key, "a");
        assert_eq!(found.value, "old");
        assert_eq!(found.tx, 2);
    }

    #[test]
    fn test_sentinel_slot_reads_as_absent() {
        let mut log = UndoLog::new();
        let ptr = log.append(1, None);

        assert!(log.get(ptr).is_none());
        // The chain itself exists, though: sentinel != purged.
        assert!(log.contains(1));
    }

    #[test]
    fn test_purged_chain_reads_as_absent() {
        let mut log = UndoLog::new();
        let ptr = log.append(1, Some(image("a", "old", 1)));

        assert!(log.delete(1));
        assert!(log.get(ptr).is_none());
        assert!(!log.contains(1));
    }

    #[test]
    fn test_delete_absent_chain() {
        let mut log = UndoLog::new();
        assert!(!log.delete(42));
    }

    #[test]
    fn test_commit_no_defaults_to_zero() {
        let mut log = UndoLog::new();
        assert_eq!(log.commit_no(1), NO_COMMIT);

        log.append(1, None);
        assert_eq!(log.commit_no(1), NO_COMMIT);
    }

    #[test]
    fn test_commit_no_stamp_round_trip() {
        let mut log = UndoLog::new();
        log.append(1, None);
        log.set_commit_no(1, 9);

        assert_eq!(log.commit_no(1), 9);
    }

    #[test]
    fn test_stamp_without_chain_is_noop() {
        let mut log = UndoLog::new();
        log.set_commit_no(5, 3);

        // No chain was conjured up for the read-only writer.
        assert!(!log.contains(5));
        assert_eq!(log.commit_no(5), NO_COMMIT);
    }

    #[test]
    fn test_len_counts_writers_not_images() {
        let mut log = UndoLog::new();
        log.append(1, None);
        log.append(1, Some(image("a", "1", 1)));
        log.append(2, None);

        assert_eq!(log.len(), 2);
        assert!(!log.is_empty());
    }
}
