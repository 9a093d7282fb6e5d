//! In-memory key-value store.
//!
//! Records live in a `tokio::sync::RwLock<HashMap>`.  Used by the router
//! tests; provisioning is a no-op.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::store::{KeyValueStore, MessageRecord};

/// In-memory message store.
#[derive(Default)]
pub struct MemoryMessageStore {
    records: tokio::sync::RwLock<HashMap<String, MessageRecord>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryMessageStore {
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }

    fn put_message(
        &self,
        record: MessageRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.records
                .write()
                .await
                .insert(record.id.clone(), record);
            Ok(())
        })
    }

    fn get_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<MessageRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.records.read().await.get(&id).cloned()) })
    }

    fn list_messages(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<MessageRecord>>> + Send + '_>> {
        Box::pin(async move { Ok(self.records.read().await.values().cloned().collect()) })
    }

    fn update_message(
        &self,
        id: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let id = id.to_string();
        let message = message.to_string();
        Box::pin(async move {
            let mut records = self.records.write().await;
            match records.get_mut(&id) {
                Some(record) => {
                    record.message = message;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_message(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.records.write().await.remove(&id).is_some()) })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, message: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryMessageStore::new();
        store.put_message(record("1", "hello")).await.unwrap();

        let fetched = store.get_message("1").await.unwrap();
        assert_eq!(fetched, Some(record("1", "hello")));
        assert_eq!(store.get_message("2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryMessageStore::new();
        store.put_message(record("1", "first")).await.unwrap();
        store.put_message(record("1", "second")).await.unwrap();

        let fetched = store.get_message("1").await.unwrap().unwrap();
        assert_eq!(fetched.message, "second");
        assert_eq!(store.list_messages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_empty() {
        let store = MemoryMessageStore::new();
        assert!(store.list_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_existing_and_missing() {
        let store = MemoryMessageStore::new();
        store.put_message(record("1", "old")).await.unwrap();

        assert!(store.update_message("1", "new").await.unwrap());
        assert_eq!(
            store.get_message("1").await.unwrap().unwrap().message,
            "new"
        );
        assert!(!store.update_message("missing", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let store = MemoryMessageStore::new();
        store.put_message(record("1", "bye")).await.unwrap();

        assert!(store.delete_message("1").await.unwrap());
        assert_eq!(store.get_message("1").await.unwrap(), None);
        assert!(!store.delete_message("1").await.unwrap());
    }
}
