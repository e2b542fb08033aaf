//! Execution request normalization
//!
//! Turns the loosely-typed `{language, code}` pair a client submits into an
//! [`ExecutionRequest`] the dispatcher can send as-is:
//! - the language label is checked against the closed [`Language`] set,
//! - the code is decoded when it arrives form-urlencoded,
//! - bare Java snippets are wrapped in a `Main` class.
//!
//! Two heuristics are kept on purpose and documented as limitations:
//! sniffing whether code "looks" urlencoded, and the `class Main` substring
//! test for Java. A caller that knows its encoding should pass
//! [`CodeEncoding`] explicitly; the sniffing path only runs when no encoding
//! is given and the compatibility fallback is enabled.

use crate::language::Language;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

static PERCENT_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").expect("valid regex"));

/// Rejections a user can fix by changing their input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// How the submitted code is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeEncoding {
    /// Use the text verbatim
    Plain,
    /// `application/x-www-form-urlencoded` (`+` is a space)
    Form,
}

/// A canonical, ready-to-dispatch execution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Decoded plaintext source, Java wrapper already applied
    pub source_text: String,
    pub language: Language,
}

impl ExecutionRequest {
    pub fn runtime(&self) -> &'static str {
        self.language.runtime()
    }

    pub fn entry_filename(&self) -> &'static str {
        self.language.entry_filename()
    }
}

/// Normalizer with a configurable decoding policy
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    sniff_fallback: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            sniff_fallback: true,
        }
    }
}

impl Normalizer {
    /// `sniff_fallback` decides what happens to code submitted without an
    /// explicit encoding: sniff it (`true`) or take it verbatim (`false`).
    pub fn new(sniff_fallback: bool) -> Self {
        Self { sniff_fallback }
    }

    pub fn normalize(
        &self,
        language: Option<&str>,
        code: Option<&str>,
        encoding: Option<CodeEncoding>,
    ) -> Result<ExecutionRequest, ValidationError> {
        let label = language
            .filter(|l| !l.is_empty())
            .ok_or(ValidationError::MissingField("language"))?;
        let raw = code.ok_or(ValidationError::MissingField("code"))?;

        let language = Language::from_label(label)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(label.to_string()))?;

        let decoded = match encoding {
            Some(CodeEncoding::Plain) => raw.to_string(),
            Some(CodeEncoding::Form) => decode_form(raw).unwrap_or_else(|| raw.to_string()),
            None if self.sniff_fallback => sniff_decode(raw),
            None => raw.to_string(),
        };

        let source_text = if language == Language::Java && !decoded.contains("class Main") {
            wrap_java(&decoded)
        } else {
            decoded
        };

        Ok(ExecutionRequest {
            source_text,
            language,
        })
    }
}

/// Normalize with the compatibility policy: no explicit encoding, sniffing on.
pub fn normalize(
    language_label: &str,
    raw_code: Option<&str>,
) -> Result<ExecutionRequest, ValidationError> {
    Normalizer::default().normalize(Some(language_label), raw_code, None)
}

/// Whether text looks form-urlencoded: it holds a `%XX` escape or a `+`.
///
/// Source code legitimately containing `+` (`a + b`) matches too, so this
/// can mis-decode plain code.
pub fn looks_encoded(input: &str) -> bool {
    input.contains('+') || PERCENT_ESCAPE.is_match(input)
}

/// Decode text that looks encoded, falling back to the raw text on failure
pub fn sniff_decode(input: &str) -> String {
    if !looks_encoded(input) {
        return input.to_string();
    }
    decode_form(input).unwrap_or_else(|| input.to_string())
}

/// Strict `application/x-www-form-urlencoded` decoding.
///
/// Returns `None` for a `%` not followed by two hex digits or when the
/// decoded bytes are not UTF-8.
pub fn decode_form(input: &str) -> Option<String> {
    if has_malformed_escape(input) {
        return None;
    }
    let spaced = input.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

fn has_malformed_escape(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}

/// Wrap a bare Java snippet in `public class Main { main(...) { ... } }`.
///
/// This is textual: a snippet that declares methods or fields of its own
/// ends up inside `main` and will not compile.
pub fn wrap_java(snippet: &str) -> String {
    format!(
        concat!(
            "public class Main {{\n",
            "    public static void main(String[] args) {{\n",
            "        {}\n",
            "    }}\n",
            "}}"
        ),
        snippet
    )
}
