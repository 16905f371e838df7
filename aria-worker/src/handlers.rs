// Handler for the external generation service.

use anyhow::{bail, Context, Result};
use aria_core::config::GenerationConfig;
use aria_core::registry::{HandlerOutput, JobHandler};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Executes generation jobs by POSTing the prompt to the generation
/// service and returning the raw response body.
///
/// The catalogue's CRUD layer harvests the persisted response into its own
/// records, so no record id is produced here.
pub struct GenerationHandler {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GenerationHandler {
    /// Create a handler with the service's own request timeout; the queue
    /// engine imposes none of its own.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client for the generation service")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl JobHandler for GenerationHandler {
    async fn execute(&self, job_id: i64, prompt: &str, model: &str) -> Result<HandlerOutput> {
        let url = format!("{}/v1/generate", self.endpoint);
        tracing::debug!(job_id, model, "Calling generation service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": model, "prompt": prompt }))
            .send()
            .await
            .context("Generation request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read generation response body")?;

        if !status.is_success() {
            bail!("Generation service returned {}: {}", status, body);
        }

        Ok(HandlerOutput {
            raw_response: body,
            record_id: None,
        })
    }
}
