// Handler registry: maps a job type to its execution capability.
//
// The registry is built once at process wiring time and passed by Arc into
// the executor; registration is not a hot path.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Output of a successful handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    /// Raw response text from the generation service, persisted verbatim
    /// on the job row.
    pub raw_response: String,
    /// Id of the catalogue record the handler wrote, when it wrote one.
    /// Handler-side writes are not transactional with the job row.
    pub record_id: Option<i64>,
}

/// Execution capability for jobs of one declared type.
///
/// Any error is treated uniformly downstream: the attempt is marked failed,
/// no error subtypes are distinguished at this layer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job_id: i64, prompt: &str, model: &str) -> Result<HandlerOutput>;
}

/// Maps job type strings to registered handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `job_type`, overwriting any prior
    /// registration for the same key.
    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        tracing::debug!(job_type = %job_type, "Handler registered");
        self.handlers.insert(job_type, handler);
    }

    /// Look up the handler for `job_type`.
    pub fn lookup(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
