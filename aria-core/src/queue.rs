// JobQueue facade: the engine surface consumed by the catalogue app.

use crate::config::QueueConfig;
use crate::errors::StoreError;
use crate::executor::Executor;
use crate::models::{JobStatus, JobStatusSummary};
use crate::recovery;
use crate::registry::HandlerRegistry;
use crate::scheduler::SchedulerEngine;
use crate::store::JobStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Synchronous receipt for a manual trigger request.
///
/// Acceptance hands back the handle of the spawned execution; the caller
/// may await it or discard it, errors inside the task are logged either
/// way. Rejection carries the precondition that failed; nothing was
/// mutated unless a failed row was reset as part of an accepted retry.
pub enum TriggerDecision {
    Accepted { handle: JoinHandle<()> },
    Rejected { reason: String },
}

impl TriggerDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TriggerDecision::Accepted { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            TriggerDecision::Accepted { .. } => None,
            TriggerDecision::Rejected { reason } => Some(reason),
        }
    }
}

/// The job queue engine: recovery, polling scheduler, manual trigger, and
/// status query behind one handle.
pub struct JobQueue {
    config: QueueConfig,
    store: Arc<dyn JobStore>,
    executor: Arc<Executor>,
    engine: Arc<SchedulerEngine>,
    scheduler_handle: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    /// Wire the engine. The registry must be fully populated before
    /// `start`; registration is not supported on a running queue.
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        let executor = Arc::new(Executor::new(Arc::clone(&store), registry));
        let engine = Arc::new(SchedulerEngine::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&executor),
        ));

        Self {
            config,
            store,
            executor,
            engine,
            scheduler_handle: Mutex::new(None),
        }
    }

    /// Run the recovery sweep, then spawn the polling scheduler.
    ///
    /// Recovery must complete before the first tick so orphaned processing
    /// rows are back in the eligibility set when polling begins.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), StoreError> {
        let mut handle_slot = self.scheduler_handle.lock().await;
        if handle_slot.is_some() {
            warn!("Job queue already started, ignoring start request");
            return Ok(());
        }

        recovery::run(self.store.as_ref()).await?;

        let engine = Arc::clone(&self.engine);
        *handle_slot = Some(tokio::spawn(async move { engine.run().await }));

        info!("Job queue started");
        Ok(())
    }

    /// Signal the scheduler to stop and await its loop. An execution
    /// already in flight finishes first; no job is cancelled mid-handler.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        self.engine.shutdown();

        let handle = self.scheduler_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }

        info!("Job queue stopped");
    }

    /// Manual trigger: execute one job outside the automatic allow-list
    /// filter, e.g. to retry a failed job or force a model not on the list.
    ///
    /// Preconditions are checked before any mutation: the job exists, its
    /// status is pending or failed, and its attempt count is below the
    /// ceiling. A failed job is reset to pending (error cleared) before the
    /// execution is spawned.
    #[instrument(skip(self))]
    pub async fn process_job_by_id(&self, id: i64) -> Result<TriggerDecision, StoreError> {
        let Some(job) = self.store.find_by_id(id).await? else {
            return Ok(TriggerDecision::Rejected {
                reason: format!("Job not found: {}", id),
            });
        };

        if job.attempts >= self.config.max_attempts {
            return Ok(TriggerDecision::Rejected {
                reason: format!(
                    "Job {} has reached the maximum of {} attempts",
                    id, self.config.max_attempts
                ),
            });
        }

        match job.status {
            JobStatus::Pending => {}
            JobStatus::Failed => {
                // Conditional reset: a concurrent actor may have moved the
                // row since the read above.
                if !self.store.reset_for_retry(id).await? {
                    return Ok(TriggerDecision::Rejected {
                        reason: format!("Job {} is no longer in a retryable state", id),
                    });
                }
            }
            other => {
                return Ok(TriggerDecision::Rejected {
                    reason: format!(
                        "Job {} is {}; only pending or failed jobs can be triggered",
                        id, other
                    ),
                });
            }
        }

        info!(job_id = id, "Manual trigger accepted");

        let executor = Arc::clone(&self.executor);
        let handle = tokio::spawn(async move {
            // The caller may have discarded the handle; report here so the
            // outcome never vanishes silently.
            if let Err(e) = executor.run(id).await {
                error!(job_id = id, error = %e, "Manually triggered execution failed");
            }
        });

        Ok(TriggerDecision::Accepted { handle })
    }

    /// Read-only status projection for UI polling.
    pub async fn get_statuses(&self, ids: &[i64]) -> Result<Vec<JobStatusSummary>, StoreError> {
        self.store.statuses(ids).await
    }
}
