use chrono::Utc;
use common::config::Settings;
use common::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::orchestrator::{Orchestrator, Outcome, RunReport};
use crate::api::models::ExecutionHandle;
use crate::storage::{ObjectStorage, open_storage};

/// Totals of an `inject` batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InjectSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl InjectSummary {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.failed
    }

    fn record(&mut self, report: &RunReport) {
        match report.outcome {
            Outcome::Accepted => self.accepted += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct PipelineService {
    orchestrator: Arc<Orchestrator>,
}

impl PipelineService {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let storage = open_storage(&settings.storage).await?;
        Ok(Self::with_storage(storage, settings))
    }

    pub fn with_storage(storage: Arc<dyn ObjectStorage>, settings: &Settings) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(storage, settings)),
        }
    }

    /// Starts a run in the background and returns its handle right away.
    pub fn submit(&self, tuple: &str) -> Result<ExecutionHandle> {
        let tuple = tuple.trim();
        if tuple.is_empty() {
            return Err(Error::InvalidInput("tuple must not be empty".to_string()));
        }

        let handle = ExecutionHandle {
            execution_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };

        let orchestrator = Arc::clone(&self.orchestrator);
        let execution_id = handle.execution_id;
        let tuple = tuple.to_string();
        tokio::spawn(async move {
            orchestrator.run_with_id(execution_id, &tuple).await;
        });

        info!(%execution_id, "Pipeline run submitted");
        Ok(handle)
    }

    /// Runs a tuple to completion.
    pub async fn run(&self, tuple: &str) -> RunReport {
        self.orchestrator.run(tuple).await
    }

    /// Runs every tuple with at most `concurrency` runs in flight.
    pub async fn inject<I>(&self, tuples: I, concurrency: usize) -> InjectSummary
    where
        I: IntoIterator<Item = String>,
    {
        let concurrency = concurrency.max(1);
        let mut pending = tuples.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut summary = InjectSummary::default();

        let spawn = |tuple: String| {
            let orchestrator = Arc::clone(&self.orchestrator);
            async move { orchestrator.run(&tuple).await }
        };

        for tuple in pending.by_ref().take(concurrency) {
            in_flight.push(spawn(tuple));
        }

        while let Some(report) = in_flight.next().await {
            summary.record(&report);
            if let Some(tuple) = pending.next() {
                in_flight.push(spawn(tuple));
            }
        }

        info!(
            total = summary.total(),
            accepted = summary.accepted,
            rejected = summary.rejected,
            failed = summary.failed,
            "Injection finished"
        );
        summary
    }

    /// Reads one tuple per line from `path` and injects them; blank lines are skipped.
    pub async fn inject_file(&self, path: impl AsRef<Path>, concurrency: usize) -> Result<InjectSummary> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let tuples: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if tuples.is_empty() {
            warn!(path = %path.display(), "No tuples to inject");
        }

        Ok(self.inject(tuples, concurrency).await)
    }
}
