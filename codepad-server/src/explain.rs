//! Plain-language code explanations from an OpenAI-compatible chat API
//!
//! Configuration:
//! - base_url: chat completions API root (default: Groq's OpenAI endpoint)
//! - api_key: `CODEPAD_EXPLAIN_API_KEY`, else `GROQ_API_KEY`; optional for
//!   local proxies that do not check it
//! - model: model name understood by that API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_EXPLAIN_URL: &str = "https://api.groq.com/openai/v1";

/// Small, fast model; explanations do not need more
pub const DEFAULT_EXPLAIN_MODEL: &str = "llama-3.1-8b-instant";

/// Returned when the model answers without any text
pub const NO_EXPLANATION: &str = "No explanation returned.";

const TEMPERATURE: f32 = 0.4;

/// Errors from the explanation backend
#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Explanation service returned HTTP {status}")]
    Status { status: u16, body: String },
}

/// An explanation plus the backend's full reply
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub text: String,
    pub raw: serde_json::Value,
}

/// Something that can explain a snippet
#[async_trait]
pub trait Explainer: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn explain(&self, language: &str, code: &str) -> Result<Explanation, ExplainError>;
}

/// The prompt sent for a snippet
pub fn prompt(language: &str, code: &str) -> String {
    format!("Explain this {} code in simple steps:\n\n{}", language, code)
}

/// Client for `POST {base_url}/chat/completions`
pub struct ChatExplainer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatExplainer {
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExplainError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// First choice's text, if the reply has any
fn first_choice(raw: &serde_json::Value) -> Option<String> {
    let parsed: ChatResponse = serde_json::from_value(raw.clone()).ok()?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
}

#[async_trait]
impl Explainer for ChatExplainer {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn explain(&self, language: &str, code: &str) -> Result<Explanation, ExplainError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt(language, code),
            }],
            temperature: TEMPERATURE,
        };

        let start = Instant::now();
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Status { status, body });
        }

        let raw: serde_json::Value = response.json().await?;
        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Explanation received"
        );

        Ok(Explanation {
            text: first_choice(&raw).unwrap_or_else(|| NO_EXPLANATION.to_string()),
            raw,
        })
    }
}
