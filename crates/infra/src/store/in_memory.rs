use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use asyncreply_core::ObjectKey;

use super::{ObjectStore, ResultSink, StoreError, WriteResult};

/// In-memory object store for tests/dev.
///
/// Objects are inserted whole under a write lock, so readers never observe a
/// partially written result.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, Bytes>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.contains_key(key))
    }

    async fn get(&self, key: &ObjectKey) -> Result<Bytes, StoreError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

#[async_trait]
impl ResultSink for InMemoryObjectStore {
    async fn put_if_absent(&self, key: &ObjectKey, data: Bytes) -> Result<WriteResult, StoreError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        if objects.contains_key(key) {
            return Ok(WriteResult::AlreadyExists);
        }
        objects.insert(key.clone(), data);
        Ok(WriteResult::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asyncreply_core::OperationId;

    #[tokio::test]
    async fn absent_until_written() {
        let store = InMemoryObjectStore::new();
        let key = ObjectKey::for_result(OperationId::new());

        assert!(!store.exists(&key).await.unwrap());
        assert!(matches!(store.get(&key).await, Err(StoreError::NotFound(_))));

        let res = store
            .put_if_absent(&key, Bytes::from_static(b"done"))
            .await
            .unwrap();
        assert_eq!(res, WriteResult::Written);
        assert!(store.exists(&key).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"done"));
    }

    #[tokio::test]
    async fn results_are_write_once() {
        let store = InMemoryObjectStore::new();
        let key = ObjectKey::for_result(OperationId::new());

        store.put_if_absent(&key, Bytes::from_static(b"first")).await.unwrap();
        let res = store
            .put_if_absent(&key, Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(res, WriteResult::AlreadyExists);
        assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"first"));
        assert_eq!(store.len(), 1);
    }
}
