// Executor: drives exactly one job from claim to terminal state.

use crate::errors::{ExecutionError, StoreError};
use crate::registry::HandlerRegistry;
use crate::store::JobStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of driving one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Handler succeeded; the job row holds the response.
    Completed,
    /// Handler missing or failed; the job row holds the error text.
    Failed,
    /// Another caller won the conditional claim; nothing was executed.
    AlreadyClaimed,
}

/// Drives a single job to a terminal state.
///
/// Handler errors are captured into the job row and never propagate to the
/// caller; job store write failures do propagate.
pub struct Executor {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
}

impl Executor {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Claim the job, dispatch it to its handler, and write exactly one
    /// terminal state.
    ///
    /// The claim is the first write so a crash mid-handler-call leaves
    /// durable evidence (status processing, attempts incremented) for the
    /// startup recovery sweep.
    #[instrument(skip(self), fields(job_id = id))]
    pub async fn run(&self, id: i64) -> Result<ExecutionOutcome, StoreError> {
        let Some(job) = self.store.claim(id).await? else {
            return Ok(ExecutionOutcome::AlreadyClaimed);
        };

        let Some(handler) = self.registry.lookup(&job.job_type) else {
            // The attempt counted at claim time stands; no extra attempt
            // is consumed here.
            let err = ExecutionError::NoHandler(job.job_type.clone());
            warn!(job_type = %job.job_type, "Dispatch failed, marking job failed");
            self.store.mark_failed(id, &err.to_string()).await?;
            return Ok(ExecutionOutcome::Failed);
        };

        info!(
            job_type = %job.job_type,
            model = %job.model,
            attempt = job.attempts,
            "Executing job"
        );

        match handler.execute(job.id, &job.prompt, &job.model).await {
            Ok(output) => {
                self.store.mark_completed(id, &output.raw_response).await?;
                info!(record_id = ?output.record_id, "Job execution succeeded");
                Ok(ExecutionOutcome::Completed)
            }
            Err(e) => {
                warn!(error = %e, "Handler failed, marking job failed");
                self.store.mark_failed(id, &e.to_string()).await?;
                Ok(ExecutionOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Job, JobStatus};
    use crate::registry::{HandlerOutput, JobHandler, MockJobHandler};
    use crate::store::MockJobStore;
    use chrono::Utc;

    fn claimed_job(id: i64, job_type: &str) -> Job {
        Job {
            id,
            job_type: job_type.to_string(),
            model: "standard".to_string(),
            prompt: "a quiet song about rain".to_string(),
            status: JobStatus::Processing,
            attempts: 1,
            response: None,
            error: None,
            started_at: Some(Utc::now()),
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    fn registry_with(job_type: &str, handler: MockJobHandler) -> Arc<HandlerRegistry> {
        let mut registry = HandlerRegistry::new();
        registry.register(job_type, Arc::new(handler) as Arc<dyn JobHandler>);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_lost_claim_is_a_no_op() {
        let mut store = MockJobStore::new();
        store.expect_claim().returning(|_| Ok(None));
        store.expect_mark_completed().never();
        store.expect_mark_failed().never();

        let executor = Executor::new(Arc::new(store), Arc::new(HandlerRegistry::new()));
        let outcome = executor.run(7).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::AlreadyClaimed);
    }

    #[tokio::test]
    async fn test_missing_handler_marks_job_failed() {
        let mut store = MockJobStore::new();
        store
            .expect_claim()
            .returning(|id| Ok(Some(claimed_job(id, "unknown"))));
        store
            .expect_mark_failed()
            .withf(|_, error| error.contains("No handler registered") && error.contains("unknown"))
            .times(1)
            .returning(|_, _| Ok(()));

        let executor = Executor::new(Arc::new(store), Arc::new(HandlerRegistry::new()));
        let outcome = executor.run(7).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_success_writes_completed_with_response() {
        let mut store = MockJobStore::new();
        store
            .expect_claim()
            .returning(|id| Ok(Some(claimed_job(id, "lyrics"))));
        store
            .expect_mark_completed()
            .withf(|id, response| *id == 7 && response == "hi")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut handler = MockJobHandler::new();
        handler.expect_execute().times(1).returning(|_, _, _| {
            Ok(HandlerOutput {
                raw_response: "hi".to_string(),
                record_id: Some(42),
            })
        });

        let executor = Executor::new(Arc::new(store), registry_with("lyrics", handler));
        let outcome = executor.run(7).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
    }

    #[tokio::test]
    async fn test_handler_error_writes_failed_with_message() {
        let mut store = MockJobStore::new();
        store
            .expect_claim()
            .returning(|id| Ok(Some(claimed_job(id, "lyrics"))));
        store
            .expect_mark_failed()
            .withf(|_, error| error == "boom")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut handler = MockJobHandler::new();
        handler
            .expect_execute()
            .returning(|_, _, _| Err(anyhow::anyhow!("boom")));

        let executor = Executor::new(Arc::new(store), registry_with("lyrics", handler));
        let outcome = executor.run(7).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Failed);
    }
}
