//! Client-maintained index of record ids.
//!
//! The ledger cannot enumerate keys, so the ids of all records are kept as a
//! JSON array of strings under one well-known key. The entry starts absent
//! (`Empty`) and becomes `Populated` on the first append; nothing ever removes
//! ids from it.
//!
//! ## Lost appends
//!
//! [`LedgerKeyIndex::append`] is a read-modify-write with no compare-and-swap
//! underneath. Two clients that both read the index before either writes it
//! back will each write their own extended copy, and the later write drops the
//! other client's id. That record stays on the ledger as an orphan: stored,
//! but invisible to listing. The policy sits behind the [`KeyIndex`] trait so
//! a merge-on-read or CAS-backed index can replace it without touching the
//! store.

use std::future::Future;

use shapley_ledger::LedgerGateway;
use tracing::{debug, warn};

use crate::record::INDEX_KEY;
use crate::{DecodeError, Result, StoreError};

/// Observed state of the index entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexState {
    /// The entry is absent or holds no ids.
    Empty,
    /// The entry decodes to these ids, in insertion order.
    Populated(Vec<String>),
    /// The entry holds bytes that are not a JSON array of strings.
    Corrupt(String),
}

impl IndexState {
    /// Ids visible to listing; a corrupt index lists nothing.
    pub fn into_ids(self) -> Vec<String> {
        match self {
            IndexState::Populated(ids) => ids,
            IndexState::Empty | IndexState::Corrupt(_) => Vec::new(),
        }
    }
}

/// Ordered set of record ids persisted on the ledger.
pub trait KeyIndex: Send + Sync {
    /// Current ids in insertion order.
    ///
    /// An absent or corrupt entry yields no ids; only transport failures
    /// are errors.
    fn read<G: LedgerGateway>(&self, ledger: &G) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Add `id` at the end of the index.
    fn append<G: LedgerGateway>(
        &self,
        ledger: &G,
        id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Last-writer-wins index stored under a single ledger key.
#[derive(Clone, Debug)]
pub struct LedgerKeyIndex {
    key: String,
}

impl LedgerKeyIndex {
    /// Index under the standard `attribution_keys` entry.
    pub fn new() -> Self {
        Self::with_key(INDEX_KEY)
    }

    /// Index under a custom entry.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The ledger key holding the index.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and classify the index entry without discarding corruption.
    pub async fn inspect<G: LedgerGateway>(&self, ledger: &G) -> Result<IndexState> {
        let bytes = ledger
            .get_data(&self.key)
            .await
            .map_err(StoreError::from_read)?;
        if bytes.is_empty() {
            return Ok(IndexState::Empty);
        }
        match decode_ids(&bytes) {
            Ok(ids) if ids.is_empty() => Ok(IndexState::Empty),
            Ok(ids) => Ok(IndexState::Populated(ids)),
            Err(DecodeError::Malformed(reason)) => Ok(IndexState::Corrupt(reason)),
        }
    }
}

impl Default for LedgerKeyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyIndex for LedgerKeyIndex {
    async fn read<G: LedgerGateway>(&self, ledger: &G) -> Result<Vec<String>> {
        let state = self.inspect(ledger).await?;
        if let IndexState::Corrupt(reason) = &state {
            warn!(key = %self.key, %reason, "key index unreadable, treating as empty");
        }
        Ok(state.into_ids())
    }

    async fn append<G: LedgerGateway>(&self, ledger: &G, id: &str) -> Result<()> {
        let mut ids = self.read(ledger).await?;
        ids.push(id.to_string());
        let bytes = encode_ids(&ids)?;
        ledger
            .set_data(&self.key, bytes)
            .await
            .map_err(|e| StoreError::from_write(&self.key, e))?;
        debug!(key = %self.key, id, len = ids.len(), "key index appended");
        Ok(())
    }
}

/// Decode an index document.
pub fn decode_ids(bytes: &[u8]) -> std::result::Result<Vec<String>, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Encode an index document.
pub fn encode_ids(ids: &[String]) -> Result<Vec<u8>> {
    serde_json::to_vec(ids).map_err(|e| StoreError::Encode(e.to_string()))
}
