use chrono::{DateTime, Utc};
use common::config::Settings;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{FlagRequest, ReasonCode, StagePayload};
use crate::processor::{
    FailureFlagger, FailureSimulator, Stage, StageError, StoreStage, TransformStage, Transformer,
    ValidateStage, Validator, fingerprint,
};
use crate::storage::{JsonTable, ObjectStorage, StatusTable};
use crate::utils::{RetryPolicy, retry_with_backoff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Stored in the final table.
    Accepted,
    /// Rejected by a business rule.
    Rejected,
    /// A stage kept failing on infrastructure.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub execution_id: Uuid,
    pub transaction_id: Option<u64>,
    pub outcome: Outcome,
    pub reason: ReasonCode,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn start(execution_id: Uuid, transaction_id: u64) -> Self {
        let now = Utc::now();
        Self {
            execution_id,
            transaction_id: Some(transaction_id),
            outcome: Outcome::Accepted,
            reason: ReasonCode::None,
            failed_stage: None,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    fn rejected(mut self, stage: Stage) -> Self {
        self.outcome = Outcome::Rejected;
        self.reason = stage.rejection_reason();
        self.failed_stage = Some(stage);
        self.finish()
    }

    fn failed(mut self, err: &StageError) -> Self {
        self.outcome = Outcome::Failed;
        self.reason = ReasonCode::from_error_type(Some(err.error_type()));
        self.failed_stage = Some(err.stage);
        self.error = Some(err.to_string());
        self.finish()
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// Drives one tuple through validate, transform and store, retrying
/// transient failures and fanning failures out to the flaggers.
pub struct Orchestrator {
    validate: ValidateStage,
    transform: TransformStage,
    store: StoreStage,
    validation_flagger: FailureFlagger,
    transformation_flagger: FailureFlagger,
    store_flagger: FailureFlagger,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(storage: Arc<dyn ObjectStorage>, settings: &Settings) -> Self {
        let tables = &settings.tables;
        let pipeline = &settings.pipeline;

        let validation = StatusTable::new(storage.clone(), &tables.validation);
        let transformation = StatusTable::new(storage.clone(), &tables.transformation);
        let store = StatusTable::new(storage.clone(), &tables.store);
        let final_records = JsonTable::new(storage, &tables.final_records);

        let transformer = Transformer::new(
            &pipeline.input_separator,
            &pipeline.transformed_separator,
            pipeline.usd_to_eur,
        );
        let store_stage = StoreStage::new(
            store.clone(),
            final_records,
            transformer.output_separator(),
        )
        .with_failure_simulator(FailureSimulator::new(pipeline.failsim_one_in));

        Self {
            validate: ValidateStage::new(
                Validator::new(&pipeline.input_separator),
                validation.clone(),
            ),
            transform: TransformStage::new(transformer, transformation.clone()),
            store: store_stage,
            validation_flagger: FailureFlagger::new(validation),
            transformation_flagger: FailureFlagger::new(transformation),
            store_flagger: FailureFlagger::new(store),
            retry: RetryPolicy::from(&settings.retry),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run(&self, tuple: &str) -> RunReport {
        self.run_with_id(Uuid::new_v4(), tuple).await
    }

    pub async fn run_with_id(&self, execution_id: Uuid, tuple: &str) -> RunReport {
        let tuple = tuple.trim();
        // computed once so every retry of validate overwrites the same record
        let transaction_id = fingerprint::generate(tuple);
        let report = RunReport::start(execution_id, transaction_id);

        info!(%execution_id, transaction_id, "Pipeline run started");

        let validated = match retry_with_backoff(&self.retry, || {
            self.validate.handle_with_id(transaction_id, tuple)
        })
        .await
        {
            Ok(payload) => payload,
            Err(e) => {
                error!(%execution_id, transaction_id, error = %e, "Validation failed");
                return report.failed(&e);
            }
        };

        if !validated.success {
            self.flag(
                &[&self.validation_flagger],
                FlagRequest::with_reason(transaction_id, validated.reason),
            )
            .await;
            return self.rejected(report, Stage::Validate);
        }

        let transformed =
            match retry_with_backoff(&self.retry, || self.transform.handle(&validated)).await {
                Ok(payload) => payload,
                Err(e) => {
                    self.flag(
                        &[&self.transformation_flagger, &self.validation_flagger],
                        FlagRequest::with_error_type(transaction_id, e.error_type()),
                    )
                    .await;
                    return self.failed(report, e);
                }
            };

        if !transformed.success {
            self.flag(
                &[&self.transformation_flagger, &self.validation_flagger],
                FlagRequest::with_reason(transaction_id, transformed.reason),
            )
            .await;
            return self.rejected(report, Stage::Transform);
        }

        match retry_with_backoff(&self.retry, || self.store.handle(&transformed)).await {
            Ok(StagePayload { success: true, .. }) => {
                info!(%execution_id, transaction_id, "Pipeline run succeeded");
                report.finish()
            }
            Ok(stored) => {
                self.flag(&self.all_flaggers(), FlagRequest::with_reason(transaction_id, stored.reason))
                    .await;
                self.rejected(report, Stage::Store)
            }
            Err(e) => {
                self.flag(
                    &self.all_flaggers(),
                    FlagRequest::with_error_type(transaction_id, e.error_type()),
                )
                .await;
                self.failed(report, e)
            }
        }
    }

    fn all_flaggers(&self) -> [&FailureFlagger; 3] {
        [
            &self.store_flagger,
            &self.transformation_flagger,
            &self.validation_flagger,
        ]
    }

    fn rejected(&self, report: RunReport, stage: Stage) -> RunReport {
        let report = report.rejected(stage);
        info!(
            execution_id = %report.execution_id,
            stage = %stage,
            reason = %report.reason,
            "Pipeline run rejected"
        );
        report
    }

    fn failed(&self, report: RunReport, err: StageError) -> RunReport {
        error!(
            execution_id = %report.execution_id,
            stage = %err.stage,
            error = %err,
            "Pipeline run failed"
        );
        report.failed(&err)
    }

    /// Flags every table concurrently. A flag that fails is logged and does
    /// not change the outcome of the run.
    async fn flag(&self, flaggers: &[&FailureFlagger], request: FlagRequest) {
        let results = join_all(flaggers.iter().map(|flagger| flagger.flag(&request))).await;

        for (flagger, result) in flaggers.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    table = %flagger.table(),
                    transaction_id = request.transaction_id,
                    error = %e,
                    "Unable to flag transaction"
                );
            }
        }
    }
}
