//! Codepad - execution dispatch and team workspace reconciliation
//!
//! This crate provides:
//! - Normalization of `{language, code}` submissions into sandbox requests
//! - Dispatch to a Piston-compatible execution sandbox
//! - A shared, last-write-wins team document with memory, file and HTTP stores
//! - The editor session state machine that guards unsaved work
//! - Chat webhook sharing, LLM code explanations, and the REST API tying it together

pub mod api;
pub mod dispatch;
pub mod explain;
pub mod language;
pub mod normalize;
pub mod sandbox;
pub mod share;
pub mod store;
pub mod workspace;

pub use dispatch::{DispatchError, Dispatcher, ExecutionResult};
pub use language::Language;
pub use normalize::{CodeEncoding, ExecutionRequest, Normalizer, ValidationError};
pub use store::{WorkspaceDocument, WorkspaceStore};
pub use workspace::{EditorSession, Mode, Reconciler};

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for the codepad server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodepadConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub decode: DecodeConfig,

    #[serde(default)]
    pub team: TeamConfig,

    #[serde(default)]
    pub share: ShareConfig,

    #[serde(default)]
    pub explain: ExplainConfig,
}

impl CodepadConfig {
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "0.0.0.0:8080".to_string() }

/// Execution sandbox settings
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Base URL of the Piston API
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,

    /// Upper bound on a single run, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: default_sandbox_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sandbox_url() -> String { sandbox::DEFAULT_PISTON_URL.to_string() }
fn default_timeout_secs() -> u64 { 20 }

/// How submitted code without an explicit encoding is treated
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeConfig {
    /// Sniff for urlencoding when the client does not say (legacy clients)
    #[serde(default = "default_sniff_fallback")]
    pub sniff_fallback: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            sniff_fallback: default_sniff_fallback(),
        }
    }
}

fn default_sniff_fallback() -> bool { true }

/// Where the team document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamBackend {
    #[default]
    Memory,
    File,
}

/// Team document storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub backend: TeamBackend,

    /// JSON file used by the `file` backend
    #[serde(default = "default_team_path")]
    pub path: PathBuf,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            backend: TeamBackend::default(),
            path: default_team_path(),
        }
    }
}

fn default_team_path() -> PathBuf { PathBuf::from("data/team-workspace.json") }

/// Chat webhook settings
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Incoming-webhook URL; `CODEPAD_WEBHOOK_URL` takes precedence
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Longest message sent, in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize { share::DEFAULT_MAX_CHARS }

/// Code explanation settings. The API key only comes from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainConfig {
    /// OpenAI-compatible API root
    #[serde(default = "default_explain_url")]
    pub base_url: String,

    #[serde(default = "default_explain_model")]
    pub model: String,

    #[serde(default = "default_explain_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            base_url: default_explain_url(),
            model: default_explain_model(),
            timeout_secs: default_explain_timeout_secs(),
        }
    }
}

fn default_explain_url() -> String { explain::DEFAULT_EXPLAIN_URL.to_string() }
fn default_explain_model() -> String { explain::DEFAULT_EXPLAIN_MODEL.to_string() }
fn default_explain_timeout_secs() -> u64 { 60 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CodepadConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.sandbox.base_url, "https://emkc.org/api/v2/piston");
        assert_eq!(config.sandbox.timeout_secs, 20);
        assert!(config.decode.sniff_fallback);
        assert_eq!(config.team.backend, TeamBackend::Memory);
        assert_eq!(config.share.max_chars, 4800);
        assert!(config.share.webhook_url.is_none());
        assert_eq!(config.explain.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.explain.model, "llama-3.1-8b-instant");
        assert_eq!(config.explain.timeout_secs, 60);
    }

    #[test]
    fn test_partial_config() {
        let config = CodepadConfig::from_toml(
            r#"
            [sandbox]
            base_url = "http://piston:2000/api/v2"
            timeout_secs = 5

            [decode]
            sniff_fallback = false

            [team]
            backend = "file"
            path = "/var/lib/codepad/team.json"

            [explain]
            base_url = "http://localhost:4000"
            model = "coding-best"
            "#,
        )
        .unwrap();
        assert_eq!(config.sandbox.base_url, "http://piston:2000/api/v2");
        assert_eq!(config.sandbox.timeout_secs, 5);
        assert!(!config.decode.sniff_fallback);
        assert_eq!(config.team.backend, TeamBackend::File);
        assert_eq!(config.team.path, PathBuf::from("/var/lib/codepad/team.json"));
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.explain.base_url, "http://localhost:4000");
        assert_eq!(config.explain.model, "coding-best");
        assert_eq!(config.explain.timeout_secs, 60);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(CodepadConfig::from_toml("[team]\nbackend = \"redis\"").is_err());
    }
}
