//! Error types for mvkv
//!
//! Two error kinds cross the engine boundary (`NotFound`, a wrapped lock
//! failure), plus one internal lock-manager kind (`NotLocked`) that only
//! surfaces from `commit` when a handle's locked-key set disagrees with the
//! lock manager. We use `thiserror` for `Display` and `Error` impls.
//!
//! Nothing here is fatal at engine level: a failed `set` leaves the
//! transaction active with its existing locks intact, and the caller decides
//! whether to retry or commit-and-release.

use thiserror::Error;

/// Result type alias for mvkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by the lock manager.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// Acquisition did not succeed within the lock timeout.
    ///
    /// The acquisition leaves no partial state; the caller may retry.
    #[error("lock acquisition timed out")]
    Timeout,

    /// Unlock of a key the calling transaction does not hold.
    #[error("key not locked by this transaction")]
    NotLocked,
}

/// Errors surfaced at the transaction boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No version of the key is visible to the reader.
    #[error("key not found")]
    NotFound,

    /// A lock-manager failure, wrapped with the operation that hit it.
    #[error("{op}: {source}")]
    Lock {
        /// The transaction-layer operation that failed ("exclusive lock",
        /// "shared lock", "unlock").
        op: &'static str,
        /// The underlying lock-manager error.
        #[source]
        source: LockError,
    },
}

impl Error {
    /// Wrap a lock-manager error with the failing operation's name.
    pub fn lock(op: &'static str, source: LockError) -> Self {
        Error::Lock { op, source }
    }

    /// Check if this error means "no visible version".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Check if this error is a lock-acquisition timeout.
    ///
    /// Used for retry logic: a timed-out `set` left no partial state and
    /// the transaction is still active.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Lock {
                source: LockError::Timeout,
                ..
            }
        )
    }

    /// Check if this error reports an unlock of an unheld key.
    ///
    /// Indicates an internal invariant violation between a handle's
    /// locked-key set and the lock manager.
    pub fn is_not_locked(&self) -> bool {
        matches!(
            self,
            Error::Lock {
                source: LockError::NotLocked,
                ..
            }
        )
    }
}
