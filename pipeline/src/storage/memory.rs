use async_trait::async_trait;
use common::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

use super::s3::ObjectStorage;

/// Process-local object storage, used by the `memory` backend and by tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    bucket: String,
    objects: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        self.objects.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Error::NotFound(format!("Object {} not found in bucket {}", key, self.bucket))
            })
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
