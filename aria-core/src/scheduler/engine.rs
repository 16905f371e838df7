// Polling scheduler engine.
//
// Polling rather than push: producers insert rows from outside this
// process's address space, so discovery cannot rely on an in-process
// notification channel. The cost is one poll interval of added latency.

use crate::config::QueueConfig;
use crate::errors::StoreError;
use crate::executor::{ExecutionOutcome, Executor};
use crate::store::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

/// Timer-driven loop that discovers and drains eligible jobs.
///
/// A single cooperative loop, not a thread pool: each tick synchronously
/// drains all currently eligible jobs before yielding back to the timer,
/// so automatic executions are serialized and ticks never overlap.
pub struct SchedulerEngine {
    config: QueueConfig,
    store: Arc<dyn JobStore>,
    executor: Arc<Executor>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SchedulerEngine {
    pub fn new(config: QueueConfig, store: Arc<dyn JobStore>, executor: Arc<Executor>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            config,
            store,
            executor,
            shutdown_tx,
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal the polling loop to stop. Cancels the timer only; a job
    /// already in flight finishes before the loop observes the signal.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the polling loop until shutdown is signalled.
    #[instrument(skip(self), fields(poll_interval_ms = self.config.poll_interval_ms))]
    pub async fn run(&self) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_attempts = self.config.max_attempts,
            auto_models = ?self.config.auto_models,
            "Starting scheduler engine"
        );

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    match self.drain().await {
                        Ok(count) => {
                            if count > 0 {
                                info!(jobs_processed = count, "Drained eligible jobs");
                            } else {
                                debug!("No jobs eligible for execution");
                            }
                        }
                        Err(e) => {
                            // The tick is aborted; the loop itself survives.
                            error!(error = %e, "Scheduler tick aborted");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler engine stopped");
    }

    /// Drain one tick: repeatedly claim the oldest eligible job and hand it
    /// to the executor until none remain. Returns the number of jobs driven
    /// to a terminal state.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> Result<usize, StoreError> {
        // An empty allow-list disables automatic processing entirely.
        if self.config.auto_models.is_empty() {
            return Ok(0);
        }

        let mut processed_count = 0;

        while let Some(job) = self
            .store
            .next_eligible(self.config.max_attempts, &self.config.auto_models)
            .await?
        {
            match self.executor.run(job.id).await? {
                ExecutionOutcome::Completed | ExecutionOutcome::Failed => {
                    processed_count += 1;
                }
                ExecutionOutcome::AlreadyClaimed => {
                    // The manual trigger path got there first; the row is
                    // now processing and drops out of the eligibility set.
                    debug!(job_id = job.id, "Job claimed elsewhere, skipping");
                }
            }
        }

        Ok(processed_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerRegistry;
    use crate::store::MockJobStore;

    #[tokio::test]
    async fn test_empty_allow_list_disables_drain() {
        let mut store = MockJobStore::new();
        store.expect_next_eligible().never();
        let store: Arc<dyn JobStore> = Arc::new(store);

        let executor = Arc::new(Executor::new(
            Arc::clone(&store),
            Arc::new(HandlerRegistry::new()),
        ));
        let config = QueueConfig {
            auto_models: Vec::new(),
            ..QueueConfig::default()
        };

        let engine = SchedulerEngine::new(config, store, executor);
        assert_eq!(engine.drain().await.unwrap(), 0);
    }
}
