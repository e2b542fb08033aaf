//! Execution sandbox abstraction
//!
//! The sandbox is a third-party service that compiles and runs one source
//! file and reports what the program printed. Only its wire contract lives
//! here: a request naming a runtime and files, a response carrying a `run`
//! object.

mod piston;

pub use piston::{DEFAULT_PISTON_URL, PistonSandbox};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the sandbox
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Sandbox returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout waiting for sandbox")]
    Timeout,
}

/// A file submitted for execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxFile {
    pub name: String,
    pub content: String,
}

/// Request in the sandbox's wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRequest {
    /// Runtime name, e.g. `python3`
    pub language: String,
    /// Runtime version; `*` lets the sandbox pick its latest
    pub version: String,
    pub files: Vec<SandboxFile>,
}

impl SandboxRequest {
    /// Single-file request against the newest available runtime
    pub fn single_file(
        runtime: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            language: runtime.into(),
            version: "*".to_string(),
            files: vec![SandboxFile {
                name: name.into(),
                content: content.into(),
            }],
        }
    }
}

/// Response from the sandbox.
///
/// `run` is kept as raw JSON: beyond `stdout` and `stderr` it carries exit
/// codes and signals that callers may want but that are not modeled here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SandboxResponse {
    #[serde(default)]
    pub run: serde_json::Value,
}

impl SandboxResponse {
    pub fn stdout(&self) -> &str {
        self.stream("stdout")
    }

    pub fn stderr(&self) -> &str {
        self.stream("stderr")
    }

    fn stream(&self, key: &str) -> &str {
        self.run.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}

/// Health status of the sandbox
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Trait for execution sandboxes
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Get the sandbox name for logging/identification
    fn name(&self) -> &str;

    /// Submit a request and wait for the run to finish
    async fn execute(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError>;

    /// Check if the sandbox is reachable
    async fn health_check(&self) -> HealthStatus;
}
