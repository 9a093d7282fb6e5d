//! Abstract key-value store trait.
//!
//! Any record backend must implement [`KeyValueStore`].  The trait uses
//! manually desugared async methods (pinned futures) so it can live behind
//! an `Arc<dyn KeyValueStore>` in shared application state.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// The single persisted entity: a message addressed by its unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique identifier; the sole key in the store.
    pub id: String,
    /// Message body.
    pub message: String,
}

/// Async key-value store contract.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Idempotently ensure the backing container (table) exists.
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Insert or overwrite a message record.
    fn put_message(
        &self,
        record: MessageRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Fetch a single record by id.
    fn get_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<MessageRecord>>> + Send + '_>>;

    /// Scan every stored record (unbounded, arbitrary order).
    fn list_messages(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<MessageRecord>>> + Send + '_>>;

    /// Conditionally set the message body of an existing record.
    /// Returns `false` (without writing) when the id does not exist.
    fn update_message(
        &self,
        id: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Conditionally delete an existing record.
    /// Returns `false` when the id does not exist.
    fn delete_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;
}
