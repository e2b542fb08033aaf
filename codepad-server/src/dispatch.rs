//! Execution dispatch
//!
//! Sends a normalized request to the sandbox exactly once and folds the
//! run's output streams into the single string the editor shows.

use crate::normalize::ExecutionRequest;
use crate::sandbox::{Sandbox, SandboxError, SandboxRequest};
use std::sync::Arc;
use thiserror::Error;

/// Shown when a run printed nothing at all
pub const EMPTY_OUTPUT: &str = "(empty output)";

/// Separator placed between stdout and stderr
pub const STDERR_SEPARATOR: &str = "\n[stderr]\n";

/// Errors from dispatching a run
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The sandbox answered with a failure status or did not answer in time
    #[error("Compiler service unreachable")]
    ServiceUnreachable,

    /// Anything else: connection failures, malformed responses
    #[error("{0}")]
    Internal(String),
}

impl From<SandboxError> for DispatchError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Status { .. } | SandboxError::Timeout => {
                DispatchError::ServiceUnreachable
            }
            SandboxError::HttpError(e) => DispatchError::Internal(e.to_string()),
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Merged, trimmed text for display
    pub display_output: String,
    /// The sandbox's `run` object, untouched
    pub raw: serde_json::Value,
}

impl ExecutionResult {
    pub fn new(stdout: String, stderr: String, raw: serde_json::Value) -> Self {
        let display_output = merge_output(&stdout, &stderr);
        Self {
            stdout,
            stderr,
            display_output,
            raw,
        }
    }
}

/// Merge stdout and stderr into display text.
///
/// A non-empty stderr is appended under a `[stderr]` label, the result is
/// trimmed, and an empty result becomes [`EMPTY_OUTPUT`].
pub fn merge_output(stdout: &str, stderr: &str) -> String {
    let mut merged = String::with_capacity(stdout.len() + stderr.len() + STDERR_SEPARATOR.len());
    merged.push_str(stdout);
    if !stderr.is_empty() {
        merged.push_str(STDERR_SEPARATOR);
        merged.push_str(stderr);
    }

    let trimmed = merged.trim();
    if trimmed.is_empty() {
        EMPTY_OUTPUT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Dispatches execution requests to a sandbox
pub struct Dispatcher {
    sandbox: Arc<dyn Sandbox>,
}

impl Dispatcher {
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Arc<dyn Sandbox> {
        &self.sandbox
    }

    /// Build the sandbox's wire request for a normalized request
    pub fn payload(request: &ExecutionRequest) -> SandboxRequest {
        SandboxRequest::single_file(
            request.runtime(),
            request.entry_filename(),
            request.source_text.clone(),
        )
    }

    /// Run a request. No retries: a failure goes straight back to the caller.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, DispatchError> {
        let payload = Self::payload(request);
        let response = self.sandbox.execute(&payload).await?;

        let stdout = response.stdout().to_string();
        let stderr = response.stderr().to_string();
        Ok(ExecutionResult::new(stdout, stderr, response.run))
    }
}
