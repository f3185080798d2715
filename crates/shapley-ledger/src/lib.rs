//! # shapley-ledger
//!
//! Access layer for the opaque key-value ledger that backs the attribution
//! record store.
//!
//! The ledger is an external contract with exactly three operations:
//!
//! | Operation | Meaning |
//! |---|---|
//! | `isAvailable()` | Whether the contract is reachable and serving. |
//! | `getData(key)` | Raw bytes stored under `key`; empty bytes mean "absent". |
//! | `setData(key, bytes)` | Overwrite the bytes under `key`. |
//!
//! There is no listing, no delete, no transaction and no compare-and-swap.
//!
//! This crate provides:
//! - [`gateway::LedgerGateway`], the trait the store is written against
//! - [`memory::MemoryLedger`], a shared in-process backend with fault injection
//! - [`file::FileLedger`], a JSON-file backend used by the command line client

pub mod file;
pub mod gateway;
pub mod memory;

pub use file::FileLedger;
pub use gateway::LedgerGateway;
pub use memory::MemoryLedger;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The contract or its transport could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The account holder declined to authorize the write.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The ledger accepted the call but failed to apply the write.
    #[error("write to '{key}' failed: {reason}")]
    Write {
        /// Key being written.
        key: String,
        /// Backend-reported reason.
        reason: String,
    },

    /// Local I/O error (file-backed ledgers).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted ledger image could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Write {
            key: "attribution_keys".to_string(),
            reason: "out of gas".to_string(),
        };
        assert!(err.to_string().contains("attribution_keys"));
        assert!(err.to_string().contains("out of gas"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LedgerError = io.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
