use tracing::{debug, info};

use super::rules::{self, TransformRule};
use super::{Classification, Stage, StageError, codec};
use crate::models::{COLUMN_COUNT, ReasonCode, StagePayload};
use crate::storage::StatusTable;

/*
 * Field meanings follow the TLC yellow taxi data dictionary:
 *  - VendorID, RateCodeID, Store_and_fwd_flag and Payment_type become mnemonics
 *  - timestamps move to day-first layout
 *  - amounts move from USD to EUR at a fixed rate
 * The rewritten tuple is joined with a different separator so later
 * stages can tell it apart from a raw one.
 */
pub struct Transformer {
    input_separator: String,
    output_separator: String,
    rules: Vec<TransformRule>,
}

impl Transformer {
    pub fn new(input_separator: &str, output_separator: &str, usd_to_eur: f64) -> Self {
        Self::with_rules(
            input_separator,
            output_separator,
            rules::default_transform_rules(usd_to_eur),
        )
    }

    pub fn with_rules(
        input_separator: &str,
        output_separator: &str,
        rules: Vec<TransformRule>,
    ) -> Self {
        Self {
            input_separator: input_separator.to_string(),
            output_separator: output_separator.to_string(),
            rules,
        }
    }

    pub fn output_separator(&self) -> &str {
        &self.output_separator
    }

    pub fn transform(&self, tuple: &str) -> Classification {
        let Some(mut columns) = codec::split_exact(tuple, &self.input_separator) else {
            debug!(
                expected = COLUMN_COUNT,
                "Transform rejected: wrong column count"
            );
            return Classification::rejected(tuple);
        };

        for rule in &self.rules {
            for field in &rule.fields {
                let column = &mut columns[field.index()];
                match rule.apply(column) {
                    Some(rewritten) => *column = rewritten,
                    None => {
                        debug!(field = %field, value = %column, "Transform rejected");
                        return Classification::rejected(tuple);
                    }
                }
            }
        }

        Classification::accepted(codec::join(&columns, &self.output_separator))
    }
}

/// Transform stage: records the validated tuple in the transformation status
/// table, then rewrites it.
pub struct TransformStage {
    transformer: Transformer,
    status: StatusTable,
}

impl TransformStage {
    pub fn new(transformer: Transformer, status: StatusTable) -> Self {
        Self {
            transformer,
            status,
        }
    }

    pub async fn handle(&self, request: &StagePayload) -> Result<StagePayload, StageError> {
        let transaction_id = request.transaction_id;

        self.status
            .record(transaction_id, &request.tuple)
            .await
            .map_err(|e| StageError::new(Stage::Transform, "unable to put raw tuple", e))?;

        let classification = self.transformer.transform(&request.tuple);
        if classification.accepted {
            info!(transaction_id, "Tuple transformed");
            Ok(StagePayload::accepted(transaction_id, classification.tuple))
        } else {
            info!(transaction_id, "Tuple failed transformation");
            Ok(StagePayload::rejected(
                transaction_id,
                ReasonCode::TransformationFailed,
                classification.tuple,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const VALIDATED: &str = "1,1,2019-05-13 10:00:00,2019-05-13 10:30:00,1.0,2.3,1.0,N,10,20,1,10.00,0.5,0.5,1.0,0.0,0.3,12.30,0.0,0.0";

    fn transformer() -> Transformer {
        Transformer::new(",", "\t", 0.95)
    }

    fn with_column(tuple: &str, index: usize, value: &str) -> String {
        let mut columns = codec::split(tuple, ",");
        columns[index] = value.to_string();
        codec::join(&columns, ",")
    }

    #[test]
    fn test_full_transformation() {
        let result = transformer().transform(VALIDATED);
        assert!(result.accepted);

        let columns = codec::split(&result.tuple, "\t");
        assert_eq!(
            columns,
            vec![
                "1",
                "Creative Mobile Technologies, LLC",
                "13/05/2019 10:00:00",
                "13/05/2019 10:30:00",
                "1",
                "2.3",
                "Standard rate",
                "not a store and forward trip",
                "10",
                "20",
                "Credit card",
                "9.500000",
                "0.475000",
                "0.475000",
                "0.950000",
                "0.000000",
                "0.285000",
                "11.685000",
                "0.000000",
                "0.000000",
            ]
        );
    }

    #[test]
    fn test_output_uses_new_separator() {
        let result = transformer().transform(VALIDATED);
        assert_eq!(result.tuple.split('\t').count(), COLUMN_COUNT);
    }

    #[test]
    fn test_vendor_two_maps_to_verifone() {
        let result = transformer().transform(&with_column(VALIDATED, 1, "2"));
        assert!(result.accepted);
        assert_eq!(codec::split(&result.tuple, "\t")[1], "VeriFone Inc.");
    }

    #[test]
    fn test_unknown_vendor_is_rejected() {
        for vendor in ["3", "0", "", "CMT"] {
            let tuple = with_column(VALIDATED, 1, vendor);
            let result = transformer().transform(&tuple);
            assert!(!result.accepted, "vendor {:?} accepted", vendor);
            assert_eq!(result.tuple, tuple);
        }
    }

    #[test]
    fn test_unparsable_amount_is_rejected_but_blank_passes() {
        let garbage = with_column(VALIDATED, 14, "1.0.0");
        assert!(!transformer().transform(&garbage).accepted);

        let blank = with_column(VALIDATED, 14, "");
        let result = transformer().transform(&blank);
        assert!(result.accepted);
        assert_eq!(codec::split(&result.tuple, "\t")[14], "");
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let tuple = with_column(VALIDATED, 3, "2019/05/13 10:30");
        assert!(!transformer().transform(&tuple).accepted);
    }

    #[tokio::test]
    async fn test_stage_records_input_and_reports_reason() {
        let status = StatusTable::new(Arc::new(MemoryStorage::new("test")), "transformationStatus");
        let stage = TransformStage::new(transformer(), status.clone());
        let bad_vendor = with_column(VALIDATED, 1, "9");

        let payload = stage
            .handle(&StagePayload::accepted(5, bad_vendor.clone()))
            .await
            .unwrap();

        assert!(!payload.success);
        assert_eq!(payload.reason, ReasonCode::TransformationFailed);
        assert_eq!(status.get(5).await.unwrap().unwrap().raw_tuple, bad_vendor);
    }
}
