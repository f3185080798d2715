//! The ledger contract as seen by the client.

use std::future::Future;

use crate::Result;

/// Black-box key-value ledger.
///
/// Implementors provide the actual contract transport. Every method is a
/// suspension point; nothing else in the client awaits. Empty bytes returned
/// from [`get_data`](LedgerGateway::get_data) mean the key has never been
/// written.
pub trait LedgerGateway: Send + Sync {
    /// Ask the contract whether it is serving requests.
    fn is_available(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Read the bytes stored under `key`.
    fn get_data(&self, key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Overwrite the bytes stored under `key`.
    fn set_data(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

impl<G: LedgerGateway> LedgerGateway for std::sync::Arc<G> {
    fn is_available(&self) -> impl Future<Output = Result<bool>> + Send {
        (**self).is_available()
    }

    fn get_data(&self, key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).get_data(key)
    }

    fn set_data(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send {
        (**self).set_data(key, value)
    }
}
