// In-memory job store used by the queue tests.
//
// Mirrors the semantics of the Postgres repository, including the
// conditional claim: every mutation is a compare-and-set under one mutex,
// so a losing claimant observes `None` exactly as it would against the
// real store.

use aria_core::errors::StoreError;
use aria_core::models::{Job, JobStatus, JobStatusSummary};
use aria_core::store::JobStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<BTreeMap<i64, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn get(&self, id: i64) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }
}

/// Build a job row the way the catalogue's CRUD layer would.
pub fn job(id: i64, job_type: &str, model: &str, status: JobStatus, attempts: i32) -> Job {
    Job {
        id,
        job_type: job_type.to_string(),
        model: model.to_string(),
        prompt: "a quiet song about rain".to_string(),
        status,
        attempts,
        response: None,
        error: None,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn next_eligible(
        &self,
        max_attempts: i32,
        models: &[String],
    ) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .find(|job| {
                job.status == JobStatus::Pending
                    && job.attempts < max_attempts
                    && models.contains(&job.model)
            })
            .cloned())
    }

    async fn claim(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Processing;
                job.attempts += 1;
                job.started_at = Some(Utc::now());
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_completed(&self, id: i64, response: &str) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Job not found: {}", id)))?;
        job.status = JobStatus::Completed;
        job.response = Some(response.to_string());
        job.error = None;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Job not found: {}", id)))?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.response = None;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn reset_for_retry(&self, id: i64) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Failed => {
                job.status = JobStatus::Pending;
                job.error = None;
                job.completed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_orphaned(&self) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut reset = 0;
        for job in jobs.values_mut() {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Pending;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn statuses(&self, ids: &[i64]) -> Result<Vec<JobStatusSummary>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| jobs.get(id))
            .map(|job| JobStatusSummary {
                id: job.id,
                status: job.status,
                error: job.error.clone(),
            })
            .collect())
    }
}
