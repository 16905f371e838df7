// Postgres-backed job store.
//
// The claim and retry-reset statements are single conditional UPDATEs so
// that concurrent callers (scheduler tick vs. manual trigger) cannot both
// win: the loser's statement matches zero rows.

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::{Job, JobStatus, JobStatusSummary};
use crate::store::JobStore;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::instrument;

const JOB_COLUMNS: &str = "id, type, model, prompt, status, attempts, response, error, \
                           started_at, completed_at, created_at";

/// Repository for job-related database operations
pub struct JobRepository {
    pool: DbPool,
}

impl JobRepository {
    /// Create a new JobRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Job, StoreError> {
        let status_str: String = row.try_get("status")?;
        let status: JobStatus = status_str
            .parse()
            .map_err(|e: String| StoreError::QueryFailed(e))?;

        Ok(Job {
            id: row.try_get("id")?,
            job_type: row.try_get("type")?,
            model: row.try_get("model")?,
            prompt: row.try_get("prompt")?,
            status,
            attempts: row.try_get("attempts")?,
            response: row.try_get("response")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl JobStore for JobRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM generation_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    #[instrument(skip(self, models), fields(allow_list_len = models.len()))]
    async fn next_eligible(
        &self,
        max_attempts: i32,
        models: &[String],
    ) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM generation_jobs
            WHERE status = 'pending'
              AND attempts < $1
              AND model = ANY($2)
            ORDER BY id ASC
            LIMIT 1
            "#
        ))
        .bind(max_attempts)
        .bind(models)
        .fetch_optional(self.pool.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    #[instrument(skip(self))]
    async fn claim(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE generation_jobs
            SET status = 'processing',
                attempts = attempts + 1,
                started_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        match row.as_ref().map(Self::map_row).transpose()? {
            Some(job) => {
                tracing::info!(job_id = id, attempt = job.attempts, "Job claimed");
                Ok(Some(job))
            }
            None => {
                tracing::debug!(job_id = id, "Claim lost, job not in pending status");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, response))]
    async fn mark_completed(&self, id: i64, response: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = 'completed',
                response = $2,
                error = NULL,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(response)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Job not found: {}", id)));
        }

        tracing::info!(job_id = id, "Job completed");
        Ok(())
    }

    #[instrument(skip(self, error))]
    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = 'failed',
                error = $2,
                response = NULL,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Job not found: {}", id)));
        }

        tracing::info!(job_id = id, error, "Job failed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_for_retry(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = 'pending',
                error = NULL,
                completed_at = NULL
            WHERE id = $1 AND status = 'failed'
            "#,
        )
        .bind(id)
        .execute(self.pool.pool())
        .await?;

        let reset = result.rows_affected() > 0;
        if reset {
            tracing::info!(job_id = id, "Failed job reset to pending for retry");
        }
        Ok(reset)
    }

    #[instrument(skip(self))]
    async fn reset_orphaned(&self) -> Result<u64, StoreError> {
        // attempts is deliberately untouched; the interrupted attempt stays
        // counted toward the retry ceiling.
        let result =
            sqlx::query("UPDATE generation_jobs SET status = 'pending' WHERE status = 'processing'")
                .execute(self.pool.pool())
                .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    async fn statuses(&self, ids: &[i64]) -> Result<Vec<JobStatusSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, status, error FROM generation_jobs WHERE id = ANY($1) ORDER BY id ASC",
        )
        .bind(ids)
        .fetch_all(self.pool.pool())
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let status_str: String = row.try_get("status")?;
            let status: JobStatus = status_str
                .parse()
                .map_err(|e: String| StoreError::QueryFailed(e))?;
            summaries.push(JobStatusSummary {
                id: row.try_get("id")?,
                status,
                error: row.try_get("error")?,
            });
        }

        Ok(summaries)
    }
}
