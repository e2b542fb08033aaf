//! Piston sandbox implementation
//!
//! Talks to a Piston-compatible execution API (`POST /execute`,
//! `GET /runtimes`). The public instance lives at
//! `https://emkc.org/api/v2/piston`.

use super::{HealthStatus, Sandbox, SandboxError, SandboxRequest, SandboxResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Public Piston endpoint
pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";

/// Piston sandbox client
pub struct PistonSandbox {
    client: Client,
    base_url: String,
}

impl PistonSandbox {
    /// Create a client for the public Piston instance
    pub fn new(timeout: Duration) -> Result<Self, SandboxError> {
        Self::with_base_url(DEFAULT_PISTON_URL, timeout)
    }

    /// Create with a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SandboxError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn classify(err: reqwest::Error) -> SandboxError {
    if err.is_timeout() {
        SandboxError::Timeout
    } else {
        SandboxError::HttpError(err)
    }
}

#[async_trait]
impl Sandbox for PistonSandbox {
    fn name(&self) -> &str {
        "piston"
    }

    async fn execute(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        let url = format!("{}/execute", self.base_url);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SandboxError::Status { status, body });
        }

        let parsed: SandboxResponse = response.json().await.map_err(classify)?;
        debug!(
            runtime = request.language,
            duration_ms = start.elapsed().as_millis() as u64,
            "Sandbox run finished"
        );
        Ok(parsed)
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/runtimes", self.base_url);
        let start = Instant::now();

        let outcome = self.client.get(&url).send().await;
        let latency_ms = start.elapsed().as_millis() as u64;
        let error = match outcome {
            Ok(response) if response.status().is_success() => None,
            Ok(response) => Some(format!("HTTP {}", response.status())),
            Err(e) => Some(e.to_string()),
        };

        HealthStatus {
            healthy: error.is_none(),
            latency_ms: Some(latency_ms),
            error,
        }
    }
}
