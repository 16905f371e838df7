// Error handling for the job queue engine.

use thiserror::Error;

/// Persistence failures against the job store.
///
/// These propagate to whichever caller triggered the operation: a scheduler
/// tick aborts that tick and logs, a manual trigger surfaces the error to
/// its caller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Job not found: {0}")]
    NotFound(String),
}

/// Failures produced while driving a single job to a terminal state.
///
/// Both variants are terminal for the attempt: the executor converts them
/// into the job's `error` column rather than propagating them.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No handler registered for job type '{0}'")]
    NoHandler(String),

    #[error("Handler execution failed: {0}")]
    HandlerFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionFailed(err.to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}
