//! # shapley-store
//!
//! Client-managed attribution record store on top of an opaque key-value
//! ledger.
//!
//! The ledger cannot enumerate its keys, so the store keeps its own index of
//! record ids as one more ledger entry and reads every listed record back
//! through it. Stored bytes may be partial or corrupt; listing degrades per
//! record instead of failing as a whole.
//!
//! ## Modules
//!
//! - [`record`]: record model, id generation and key derivation
//! - [`codec`]: tolerant JSON encoding of one record
//! - [`key_index`]: the read-modify-write key index
//! - [`scorer`]: contribution score formula
//! - [`payload`]: pluggable opaque payload encoding
//! - [`stats`]: dashboard totals and ranking
//! - [`store`]: the [`RecordStore`] orchestrator
//!
//! ## Ledger layout
//!
//! | Key | Value |
//! |---|---|
//! | `attribution_keys` | JSON array of record ids, insertion order |
//! | `attribution_{id}` | JSON record document |

pub mod codec;
pub mod key_index;
pub mod payload;
pub mod record;
pub mod scorer;
pub mod stats;
pub mod store;

pub use key_index::{IndexState, KeyIndex, LedgerKeyIndex};
pub use payload::{EnvelopeEncoder, PayloadEncoder, PlainEncoder};
pub use record::{Record, RecordInput, INDEX_KEY, RECORD_KEY_PREFIX};
pub use stats::Summary;
pub use store::{Listing, RecordStore, SkippedRecord, StoreConfig, Submission};

use shapley_ledger::LedgerError;

/// A stored document could not be turned back into a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Bytes are not structured text, or a required field is missing.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The ledger could not be reached or refused to serve a read.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Stored bytes were present but unusable.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Caller input was rejected before touching the ledger.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The ledger rejected or failed a write.
    #[error("write to '{key}' failed: {reason}")]
    WriteFailure {
        /// Key being written.
        key: String,
        /// Why the write did not land.
        reason: String,
    },

    /// A value could not be serialized for storage.
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl StoreError {
    /// Map a ledger failure that happened while reading.
    pub fn from_read(err: LedgerError) -> Self {
        StoreError::BackendUnavailable(err.to_string())
    }

    /// Map a ledger failure that happened while writing `key`.
    pub fn from_write(key: &str, err: LedgerError) -> Self {
        let reason = match err {
            LedgerError::Rejected(_) => "transaction rejected by user".to_string(),
            LedgerError::Write { reason, .. } => reason,
            other => other.to_string(),
        };
        StoreError::WriteFailure {
            key: key.to_string(),
            reason,
        }
    }

    /// Whether repeating the whole operation unchanged may succeed.
    ///
    /// Validation and decode failures need different input or different
    /// stored state; retrying them is pointless.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::BackendUnavailable(_) | StoreError::WriteFailure { .. }
        )
    }
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
