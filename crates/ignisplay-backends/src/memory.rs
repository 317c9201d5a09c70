use async_trait::async_trait;
use ignisplay_models::PersistedData;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::error::BackendError;
use crate::traits::LocalBackend;

/// Process-local blob store, used when nothing should touch disk.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, PersistedData>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly, bypassing the trait
    pub async fn insert(&self, key: impl Into<String>, data: PersistedData) {
        self.blobs.write().await.insert(key.into(), data);
    }

    pub async fn get(&self, key: &str) -> Option<PersistedData> {
        self.blobs.read().await.get(key).cloned()
    }
}

#[async_trait]
impl LocalBackend for MemoryBlobStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedData>, BackendError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, data: &PersistedData) -> Result<(), BackendError> {
        self.blobs.write().await.insert(key.to_string(), data.clone());
        Ok(())
    }
}
