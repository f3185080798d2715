//! In-process ledger shared between clones.
//!
//! A [`MemoryLedger`] behaves like one deployed contract: every clone sees
//! the same key space, so several independent stores built on clones model
//! uncoordinated clients of one backend. Faults can be injected per key to
//! exercise the store's partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::gateway::LedgerGateway;
use crate::{LedgerError, Result};

#[derive(Debug)]
struct State {
    entries: HashMap<String, Vec<u8>>,
    /// Value reported by `is_available`.
    available: bool,
    /// When set, every call fails with a transport error.
    unreachable: bool,
    /// When set, every write is declined by the account holder.
    rejecting: bool,
    failing_write_prefixes: Vec<String>,
    failing_read_keys: HashSet<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            available: true,
            unreachable: false,
            rejecting: false,
            failing_write_prefixes: Vec::new(),
            failing_read_keys: HashSet::new(),
        }
    }
}

/// Shared in-memory key-value ledger.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
    writes: Arc<AtomicU64>,
}

impl MemoryLedger {
    /// Create an empty, available ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Poisoned only if a caller panicked mid-update; the map stays usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the value reported by `is_available`.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make every call fail with [`LedgerError::Unavailable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make every write fail with [`LedgerError::Rejected`].
    pub fn set_rejecting(&self, rejecting: bool) {
        self.lock().rejecting = rejecting;
    }

    /// Fail writes to any key starting with `prefix`.
    pub fn fail_writes_with_prefix(&self, prefix: impl Into<String>) {
        self.lock().failing_write_prefixes.push(prefix.into());
    }

    /// Fail reads of exactly `key`.
    pub fn fail_reads_of(&self, key: impl Into<String>) {
        self.lock().failing_read_keys.insert(key.into());
    }

    /// Remove every injected fault and make the ledger available again.
    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.available = true;
        state.unreachable = false;
        state.rejecting = false;
        state.failing_write_prefixes.clear();
        state.failing_read_keys.clear();
    }

    /// Store bytes directly, bypassing fault injection and the write counter.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.lock().entries.insert(key.into(), value.into());
    }

    /// Raw bytes under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().entries.get(key).cloned()
    }

    /// Every key currently holding a value, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful `set_data` calls across all clones.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LedgerGateway for MemoryLedger {
    async fn is_available(&self) -> Result<bool> {
        let state = self.lock();
        if state.unreachable {
            return Err(LedgerError::Unavailable("memory ledger unreachable".to_string()));
        }
        Ok(state.available)
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>> {
        let state = self.lock();
        if state.unreachable {
            return Err(LedgerError::Unavailable("memory ledger unreachable".to_string()));
        }
        if state.failing_read_keys.contains(key) {
            return Err(LedgerError::Unavailable(format!("read of '{key}' failed")));
        }
        let value = state.entries.get(key).cloned().unwrap_or_default();
        debug!(key, len = value.len(), "ledger get");
        Ok(value)
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(LedgerError::Unavailable("memory ledger unreachable".to_string()));
        }
        if state.rejecting {
            return Err(LedgerError::Rejected("user rejected transaction".to_string()));
        }
        if state
            .failing_write_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
        {
            return Err(LedgerError::Write {
                key: key.to_string(),
                reason: "injected write fault".to_string(),
            });
        }
        debug!(key, len = value.len(), "ledger set");
        state.entries.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_key_reads_empty() {
        let ledger = MemoryLedger::new();
        let value = ledger.get_data("missing").await.expect("get");
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let ledger = MemoryLedger::new();
        ledger.set_data("k", b"v".to_vec()).await.expect("set");
        assert_eq!(ledger.get_data("k").await.expect("get"), b"v".to_vec());
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = MemoryLedger::new();
        let b = a.clone();
        a.set_data("shared", b"1".to_vec()).await.expect("set");
        assert_eq!(b.raw("shared"), Some(b"1".to_vec()));
        assert_eq!(b.write_count(), 1);
    }

    #[tokio::test]
    async fn test_availability_flag() {
        let ledger = MemoryLedger::new();
        assert!(ledger.is_available().await.expect("available"));
        ledger.set_available(false);
        assert!(!ledger.is_available().await.expect("available"));
    }

    #[tokio::test]
    async fn test_unreachable_fails_every_call() {
        let ledger = MemoryLedger::new();
        ledger.set_unreachable(true);
        assert!(matches!(ledger.is_available().await, Err(LedgerError::Unavailable(_))));
        assert!(matches!(ledger.get_data("k").await, Err(LedgerError::Unavailable(_))));
        assert!(matches!(
            ledger.set_data("k", vec![1]).await,
            Err(LedgerError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_write_fault_by_prefix() {
        let ledger = MemoryLedger::new();
        ledger.fail_writes_with_prefix("attribution_keys");
        let result = ledger.set_data("attribution_keys", b"[]".to_vec()).await;
        assert!(matches!(result, Err(LedgerError::Write { .. })));
        ledger
            .set_data("attribution_1", b"{}".to_vec())
            .await
            .expect("other keys still writable");
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn test_rejecting_writes() {
        let ledger = MemoryLedger::new();
        ledger.set_rejecting(true);
        let result = ledger.set_data("k", vec![]).await;
        assert!(matches!(result, Err(LedgerError::Rejected(_))));
        assert!(ledger.raw("k").is_none());
    }

    #[tokio::test]
    async fn test_read_fault_and_clear() {
        let ledger = MemoryLedger::new();
        ledger.insert_raw("k", b"v".to_vec());
        ledger.fail_reads_of("k");
        assert!(ledger.get_data("k").await.is_err());
        ledger.clear_faults();
        assert_eq!(ledger.get_data("k").await.expect("get"), b"v".to_vec());
    }

    #[test]
    fn test_keys_sorted() {
        let ledger = MemoryLedger::new();
        ledger.insert_raw("b", vec![1]);
        ledger.insert_raw("a", vec![2]);
        assert_eq!(ledger.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
