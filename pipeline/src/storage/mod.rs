pub mod memory;
pub mod s3;
pub mod table;

pub use memory::MemoryStorage;
pub use s3::{ObjectStorage, S3Storage};
pub use table::{JsonTable, StatusTable};

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use common::Result;
use common::config::{StorageBackend, StorageSettings};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

impl From<&StorageSettings> for S3Config {
    fn from(settings: &StorageSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            region: settings.region.clone(),
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            bucket: settings.bucket.clone(),
        }
    }
}

#[derive(Clone)]
pub struct S3Manager {
    pub config: S3Config,
    client_cache: Arc<dashmap::DashMap<String, Arc<S3Client>>>,
}

impl S3Manager {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            client_cache: Arc::new(dashmap::DashMap::new()),
        }
    }

    pub async fn get_client(&self, bucket: &str) -> Result<Arc<S3Client>> {
        if let Some(client) = self.client_cache.get(bucket) {
            return Ok(client.clone());
        }

        let client = if self.config.access_key.is_empty() {
            // no static keys: use the default provider chain
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(self.config.region.clone()))
                .load()
                .await;
            Arc::new(S3Client::new(&shared))
        } else {
            let credentials = Credentials::new(
                &self.config.access_key,
                &self.config.secret_key,
                None,
                None,
                "static",
            );

            let s3_config = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(&self.config.endpoint)
                .region(Region::new(self.config.region.clone()))
                .credentials_provider(credentials)
                .force_path_style(true)
                .build();

            Arc::new(S3Client::from_conf(s3_config))
        };

        self.client_cache.insert(bucket.to_string(), client.clone());
        Ok(client)
    }

    /// Verifies that a bucket exists and is accessible
    pub async fn verify_bucket_exists(&self, bucket: &str) -> Result<()> {
        let client = self.get_client(bucket).await?;

        match client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => Err(common::Error::Storage(format!(
                "Cannot access bucket '{}': {}",
                bucket, e
            ))),
        }
    }
}

/// Builds the object storage backing every pipeline table.
pub async fn open_storage(settings: &StorageSettings) -> Result<Arc<dyn ObjectStorage>> {
    match settings.backend {
        StorageBackend::Memory => {
            info!("Using in-memory table storage");
            Ok(Arc::new(MemoryStorage::new(&settings.bucket)))
        }
        StorageBackend::S3 => {
            let manager = Arc::new(S3Manager::new(S3Config::from(settings)));
            manager.verify_bucket_exists(&settings.bucket).await?;
            info!(bucket = %settings.bucket, endpoint = %settings.endpoint, "Using S3 table storage");
            Ok(Arc::new(S3Storage::new(manager, &settings.bucket).await?))
        }
    }
}
