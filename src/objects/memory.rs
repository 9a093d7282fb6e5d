//! In-memory object store.
//!
//! Blobs live in a `tokio::sync::RwLock<HashMap>`.  Used by the router
//! tests to observe the mirrored writes; provisioning is a no-op.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::store::ObjectStore;

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: tokio::sync::RwLock<HashMap<String, Bytes>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }

    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            self.blobs.write().await.insert(key, data);
            Ok(())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.blobs.read().await.get(&key).cloned()) })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            // Idempotent, same as S3.
            self.blobs.write().await.remove(&key);
            Ok(())
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryObjectStore::new();
        store.put("1.txt", Bytes::from("hello")).await.unwrap();

        assert_eq!(
            store.get("1.txt").await.unwrap(),
            Some(Bytes::from("hello"))
        );

        store.delete("1.txt").await.unwrap();
        assert_eq!(store.get("1.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryObjectStore::new();
        store.delete("never-existed.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryObjectStore::new();
        store.put("1.txt", Bytes::from("first")).await.unwrap();
        store.put("1.txt", Bytes::from("second")).await.unwrap();

        assert_eq!(
            store.get("1.txt").await.unwrap(),
            Some(Bytes::from("second"))
        );
    }
}
