use common::Result;
use tracing::info;

use crate::models::{FlagRequest, ReasonCode};
use crate::storage::StatusTable;

/// Marks a transaction as failed in one stage's status table.
#[derive(Clone)]
pub struct FailureFlagger {
    status: StatusTable,
}

impl FailureFlagger {
    pub fn new(status: StatusTable) -> Self {
        Self { status }
    }

    pub fn table(&self) -> &str {
        self.status.name()
    }

    /// Writes the resolved reason onto the existing record and returns it.
    /// Flagging the same request twice leaves the record unchanged.
    pub async fn flag(&self, request: &FlagRequest) -> Result<ReasonCode> {
        let reason = request.resolved_reason();
        let record = self
            .status
            .update_reason(request.transaction_id, reason)
            .await?;

        info!(
            table = %self.table(),
            transaction_id = request.transaction_id,
            reason = %record.status_reason,
            "Transaction flagged"
        );

        Ok(record.status_reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use common::Error;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn flagger() -> (FailureFlagger, StatusTable) {
        let status = StatusTable::new(Arc::new(MemoryStorage::new("test")), "transformationStatus");
        (FailureFlagger::new(status.clone()), status)
    }

    #[tokio::test]
    async fn test_reason_is_written_once_and_kept() {
        let (flagger, status) = flagger();
        status.record(3, "a\tb").await.unwrap();

        let request = FlagRequest::with_reason(3, ReasonCode::TransformationFailed);
        assert_eq!(flagger.flag(&request).await.unwrap(), ReasonCode::TransformationFailed);
        assert_eq!(flagger.flag(&request).await.unwrap(), ReasonCode::TransformationFailed);

        let record = status.get(3).await.unwrap().unwrap();
        assert_eq!(record.status_reason, ReasonCode::TransformationFailed);
        assert_eq!(record.raw_tuple, "a\tb");
    }

    #[tokio::test]
    async fn test_error_type_resolves_reason() {
        let (flagger, status) = flagger();
        status.record(4, "x").await.unwrap();

        let reason = flagger
            .flag(&FlagRequest::with_error_type(4, "StoreError"))
            .await
            .unwrap();
        assert_eq!(reason, ReasonCode::StoreFailed);

        let reason = flagger
            .flag(&FlagRequest::with_error_type(4, "Boom"))
            .await
            .unwrap();
        assert_eq!(reason, ReasonCode::Unknown);
    }

    #[tokio::test]
    async fn test_missing_record_fails_condition() {
        let (flagger, status) = flagger();

        let err = flagger
            .flag(&FlagRequest::with_reason(99, ReasonCode::ValidationFailed))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConditionFailed(_)));
        assert!(status.get(99).await.unwrap().is_none());
    }
}
