use common::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use super::s3::ObjectStorage;
use crate::models::{ReasonCode, StageRecord};

/// A keyed table of JSON documents living under `<name>/` in object storage.
#[derive(Clone)]
pub struct JsonTable {
    name: String,
    storage: Arc<dyn ObjectStorage>,
}

impl JsonTable {
    pub fn new(storage: Arc<dyn ObjectStorage>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn object_key(&self, id: u64) -> String {
        format!("{}/{}.json", self.name, id)
    }

    /// Writes `item` under `id`, replacing whatever was there.
    pub async fn put<T: Serialize + Sync>(&self, id: u64, item: &T) -> Result<()> {
        let body = serde_json::to_vec(item)?;
        self.storage.put_object(&self.object_key(id), &body).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: u64) -> Result<Option<T>> {
        match self.storage.get_object(&self.object_key(id)).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_ids(&self) -> Result<Vec<u64>> {
        let prefix = format!("{}/", self.name);
        let keys = self.storage.list_objects(&prefix).await?;

        Ok(keys
            .iter()
            .filter_map(|key| {
                key.strip_prefix(&prefix)?
                    .strip_suffix(".json")?
                    .parse::<u64>()
                    .ok()
            })
            .collect())
    }
}

/// Per-stage status table holding one [`StageRecord`] per transaction.
#[derive(Clone)]
pub struct StatusTable {
    table: JsonTable,
}

impl StatusTable {
    pub fn new(storage: Arc<dyn ObjectStorage>, name: &str) -> Self {
        Self {
            table: JsonTable::new(storage, name),
        }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    /// Records that the stage saw `raw_tuple`; a retry overwrites the same key.
    pub async fn record(&self, transaction_id: u64, raw_tuple: &str) -> Result<()> {
        let record = StageRecord::new(transaction_id, raw_tuple);
        self.table.put(transaction_id, &record).await?;
        debug!(table = %self.name(), transaction_id, "Status record written");
        Ok(())
    }

    pub async fn get(&self, transaction_id: u64) -> Result<Option<StageRecord>> {
        self.table.get(transaction_id).await
    }

    /// Sets the reason of an existing record. Fails with
    /// [`Error::ConditionFailed`] when the stage never wrote one.
    pub async fn update_reason(
        &self,
        transaction_id: u64,
        reason: ReasonCode,
    ) -> Result<StageRecord> {
        let Some(mut record) = self.get(transaction_id).await? else {
            return Err(Error::ConditionFailed(format!(
                "no record for transaction {} in {}",
                transaction_id,
                self.name()
            )));
        };

        if record.status_reason != reason {
            record.status_reason = reason;
            self.table.put(transaction_id, &record).await?;
        }

        Ok(record)
    }

    pub async fn list_ids(&self) -> Result<Vec<u64>> {
        self.table.list_ids().await
    }
}
