//! Sharing code and output to a chat webhook
//!
//! Messages are markdown with fenced code blocks. User text is escaped so a
//! stray run of backticks cannot close the fence early. Messages are capped
//! because the chat side rejects large payloads; the cap cuts the user text
//! inside its fence, so a capped message still renders.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Largest message the chat side accepts reliably
pub const DEFAULT_MAX_CHARS: usize = 4800;

/// Appended to user text that had to be cut
pub const TRUNCATION_MARKER: &str = "\n…(truncated)";

const FENCE: &str = "```";
const ESCAPED_FENCE: &str = "`\u{200B}``";

/// Errors from sharing
#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("webhook not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}")]
    Rejected { status: u16, body: String },
}

/// What to share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    Code,
    Output,
    Full,
}

impl ShareKind {
    pub fn from_label(label: &str) -> Result<Self, ShareError> {
        match label {
            "code" => Ok(ShareKind::Code),
            "output" => Ok(ShareKind::Output),
            "full" => Ok(ShareKind::Full),
            other => Err(ShareError::InvalidType(other.to_string())),
        }
    }
}

/// Break up backtick runs with zero-width spaces until no triple is left
pub fn escape_fences(text: &str) -> String {
    let mut escaped = text.to_string();
    while escaped.contains(FENCE) {
        escaped = escaped.replace(FENCE, ESCAPED_FENCE);
    }
    escaped
}

fn code_section(language: &str, body: &str) -> String {
    let title = if language.is_empty() { "text" } else { language };
    format!(
        "📌 *Code Snippet ({})*\n\n{}{}\n{}\n{}",
        title, FENCE, language, body, FENCE
    )
}

fn output_section(body: &str) -> String {
    format!("📤 *Output:*\n\n{}text\n{}\n{}", FENCE, body, FENCE)
}

/// Escaped bodies of a share, before framing
struct Bodies {
    code: String,
    output: String,
}

impl Bodies {
    fn new(kind: ShareKind, code: &str, output: &str) -> Self {
        let output = if kind == ShareKind::Full && output.is_empty() {
            "No output"
        } else {
            output
        };
        Self {
            code: escape_fences(code),
            output: escape_fences(output),
        }
    }

    fn frame(&self, kind: ShareKind, language: &str) -> String {
        match kind {
            ShareKind::Code => code_section(language, &self.code),
            ShareKind::Output => output_section(&self.output),
            ShareKind::Full => format!(
                "{}\n\n{}",
                code_section(language, &self.code),
                output_section(&self.output)
            ),
        }
    }
}

/// Build the markdown message for a share, uncapped
pub fn format_message(kind: ShareKind, language: &str, code: &str, output: &str) -> String {
    Bodies::new(kind, code, output).frame(kind, language)
}

/// Build the message and cap it at `max_chars` characters.
///
/// Only the user text is cut, each body inside its own fence and ending in
/// [`TRUNCATION_MARKER`]. A `full` share splits the room evenly, and a body
/// shorter than its half hands the rest to the other. The frame itself is
/// never cut, so a cap smaller than the frame yields empty bodies.
pub fn compose_message(
    kind: ShareKind,
    language: &str,
    code: &str,
    output: &str,
    max_chars: usize,
) -> String {
    let bodies = Bodies::new(kind, code, output);
    let message = bodies.frame(kind, language);
    if message.chars().count() <= max_chars {
        return message;
    }

    let empty = Bodies {
        code: String::new(),
        output: String::new(),
    };
    let room = max_chars.saturating_sub(empty.frame(kind, language).chars().count());
    let code_len = bodies.code.chars().count();
    let output_len = bodies.output.chars().count();

    let (code_room, output_room) = match kind {
        ShareKind::Code => (room, 0),
        ShareKind::Output => (0, room),
        ShareKind::Full => {
            let half = room / 2;
            if code_len <= half {
                (code_len, room - code_len)
            } else if output_len <= room - half {
                (room - output_len, output_len)
            } else {
                (half, room - half)
            }
        }
    };

    Bodies {
        code: truncate(&bodies.code, code_room),
        output: truncate(&bodies.output, output_room),
    }
    .frame(kind, language)
}

/// Cap text at `max_chars` characters, marker included
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars < marker_len {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - marker_len).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

#[derive(Serialize)]
struct WebhookPayload {
    text_b64: String,
}

/// One-way sink for chat messages
pub struct ChatWebhook {
    client: Client,
    url: Option<String>,
    max_chars: usize,
}

impl ChatWebhook {
    pub fn new(
        url: Option<String>,
        max_chars: usize,
        timeout: Duration,
    ) -> Result<Self, ShareError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.filter(|u| !u.is_empty()),
            max_chars,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Format, cap, and post a share. Returns the webhook's reply body.
    pub async fn share(
        &self,
        kind: ShareKind,
        language: &str,
        code: &str,
        output: &str,
    ) -> Result<String, ShareError> {
        let message = compose_message(kind, language, code, output, self.max_chars);
        self.send(&message).await
    }

    /// Post a ready message, base64-encoded so the chat side never re-parses it
    pub async fn send(&self, message: &str) -> Result<String, ShareError> {
        let url = self.url.as_deref().ok_or(ShareError::NotConfigured)?;
        let payload = WebhookPayload {
            text_b64: STANDARD.encode(message),
        };

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ShareError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
