use common::{Error, Result};
use tracing::{debug, info};

use super::rules::{self, ColumnCheck, CrossCheck, Verdict};
use super::{Classification, Stage, StageError, codec};
use crate::models::{ReasonCode, StagePayload};
use crate::storage::StatusTable;

/// Per-column and cross-column rule engine for raw tuples.
pub struct Validator {
    separator: String,
    column_checks: Vec<ColumnCheck>,
    cross_checks: Vec<CrossCheck>,
}

impl Validator {
    pub fn new(separator: &str) -> Self {
        Self::with_rules(
            separator,
            rules::default_column_checks(),
            rules::default_cross_checks(),
        )
    }

    pub fn with_rules(
        separator: &str,
        column_checks: Vec<ColumnCheck>,
        cross_checks: Vec<CrossCheck>,
    ) -> Self {
        Self {
            separator: separator.to_string(),
            column_checks,
            cross_checks,
        }
    }

    /// Classifies a raw tuple. Only an empty tuple is an error; every other
    /// malformed input is a rejection.
    pub fn validate(&self, tuple: &str) -> Result<Classification> {
        let tuple = tuple.trim();
        if tuple.is_empty() {
            return Err(Error::InvalidInput("empty tuple".to_string()));
        }

        let Some(mut columns) = codec::split_exact(tuple, &self.separator) else {
            debug!("Rejected: wrong column count");
            return Ok(Classification::rejected(tuple));
        };

        for check in &self.column_checks {
            let column = &mut columns[check.field.index()];
            match check.evaluate(column) {
                Verdict::Keep => {}
                Verdict::Blank => column.clear(),
                Verdict::Reject => {
                    debug!(field = %check.field, value = %column, "Rejected by column check");
                    return Ok(Classification::rejected(tuple));
                }
            }
        }

        for check in &self.cross_checks {
            let values: Vec<&str> = check
                .fields
                .iter()
                .map(|field| columns[field.index()].as_str())
                .collect();

            if !check.evaluate(&values) {
                debug!(fields = ?check.fields, "Rejected by cross-column check");
                return Ok(Classification::rejected(tuple));
            }
        }

        Ok(Classification::accepted(codec::join(&columns, &self.separator)))
    }
}

/// Validate stage: assigns the transaction id, records the raw tuple in the
/// validation status table, then classifies it.
pub struct ValidateStage {
    validator: Validator,
    status: StatusTable,
}

impl ValidateStage {
    pub fn new(validator: Validator, status: StatusTable) -> Self {
        Self { validator, status }
    }

    /// The caller picks the transaction id, so a retried invocation
    /// overwrites its own status record.
    pub async fn handle_with_id(
        &self,
        transaction_id: u64,
        tuple: &str,
    ) -> std::result::Result<StagePayload, StageError> {
        let tuple = tuple.trim();
        if tuple.is_empty() {
            return Err(StageError::new(
                Stage::Validate,
                "receiving input",
                Error::InvalidInput("empty tuple".to_string()),
            ));
        }

        self.status
            .record(transaction_id, tuple)
            .await
            .map_err(|e| StageError::new(Stage::Validate, "unable to put raw tuple", e))?;

        let classification = self
            .validator
            .validate(tuple)
            .map_err(|e| StageError::new(Stage::Validate, "validating tuple", e))?;

        if classification.accepted {
            info!(transaction_id, "Tuple validated");
            Ok(StagePayload::accepted(transaction_id, classification.tuple))
        } else {
            info!(transaction_id, "Tuple failed validation");
            Ok(StagePayload::rejected(
                transaction_id,
                ReasonCode::ValidationFailed,
                classification.tuple,
            ))
        }
    }
}
