//! Abstract object store trait.
//!
//! The object store holds one opaque blob per message id and is a derived
//! mirror of the key-value store; callers work in terms of raw bytes.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Async object storage contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Idempotently ensure the backing container (bucket) exists.
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Write `data` to `key`, overwriting any existing blob.
    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Read the full blob at `key`, or `None` if it does not exist.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>>;

    /// Delete the blob at `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
