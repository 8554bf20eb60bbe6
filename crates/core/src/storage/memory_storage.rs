use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_key, Storage, StorageError, StorageResult};

/// In-memory storage, used by tests and by embedders that persist elsewhere
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.data.write().await.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let store = self.data.read().await;
        Ok(store
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new();

        storage.put("assembly/state", b"one").await.unwrap();
        assert_eq!(storage.get("assembly/state").await.unwrap(), b"one");

        storage.put("assembly/state", b"two").await.unwrap();
        assert_eq!(storage.get("assembly/state").await.unwrap(), b"two");

        storage.put("proposals/b", b"B").await.unwrap();
        storage.put("proposals/a", b"A").await.unwrap();
        let keys = storage.list("proposals/").await.unwrap();
        assert_eq!(keys, vec!["proposals/a".to_string(), "proposals/b".to_string()]);

        assert!(storage.exists("assembly/state").await.unwrap());
        storage.delete("assembly/state").await.unwrap();
        assert!(!storage.exists("assembly/state").await.unwrap());
        assert!(matches!(
            storage.get("assembly/state").await,
            Err(StorageError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_json_storage() {
        let storage = MemoryStorage::new();
        let data = HashMap::from([("delegate".to_string(), "did:icn:alice".to_string())]);

        storage.put_json("access/delegate", &data).await.unwrap();
        let retrieved: HashMap<String, String> = storage.get_json("access/delegate").await.unwrap();
        assert_eq!(retrieved, data);

        let missing: Option<HashMap<String, String>> =
            storage.try_get_json("access/nobody").await.unwrap();
        assert!(missing.is_none());
    }
}
