use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::result::CreateUnhandledError;
use aws_smithy_runtime_api::http::Response;
use bytes::Bytes;
use common::{Error, Result};
use std::fmt::Debug;
use std::sync::Arc;

use crate::storage::S3Manager;

/// Flat key/value object store backing the pipeline tables.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Creates or replaces the object at `key`.
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()>;
    /// Fails with [`Error::NotFound`] when `key` was never written.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>>;
}

// Service-side rejections keep their code; transport failures stay SDK errors.
fn storage_error<E>(operation: &str, key: &str, err: SdkError<E, Response>) -> Error
where
    E: ProvideErrorMetadata + CreateUnhandledError + Debug,
{
    match &err {
        SdkError::ServiceError(service) => Error::Storage(format!(
            "{} {}: {}",
            operation,
            key,
            service.err().code().unwrap_or("unknown service error")
        )),
        _ => Error::from(err),
    }
}

/// Table storage in one S3 (or MinIO) bucket.
pub struct S3Storage {
    bucket: String,
    client: Arc<S3Client>,
}

impl S3Storage {
    pub async fn new(s3_manager: Arc<S3Manager>, bucket: &str) -> Result<Self> {
        let client = s3_manager.get_client(bucket).await?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(Bytes::copy_from_slice(data).into())
            .send()
            .await
            .map_err(|e| storage_error("put", key, e))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                return Err(Error::NotFound(format!(
                    "Object {} not found in bucket {}",
                    key, self.bucket
                )));
            }
            Err(e) => return Err(storage_error("get", key, e)),
        };

        Ok(response.body.collect().await?.into_bytes().to_vec())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| storage_error("list", prefix, e))?;

            keys.extend(response.contents().iter().filter_map(|o| o.key().map(str::to_string)));

            continuation_token = response.next_continuation_token;
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(keys)
    }
}
