//! The closed set of languages the editor can run
//!
//! Every per-language convention lives here: the sandbox runtime name, the
//! entry file the sandbox compiles, the starter template shown in a fresh
//! personal session, and the file extension used for downloads and uploads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language the sandbox can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "python")]
    Python,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "c")]
    C,
    #[serde(rename = "c++")]
    Cpp,
}

impl Language {
    /// All supported languages, in the order the editor lists them
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::JavaScript,
    ];

    /// Language a fresh session starts in
    pub const DEFAULT: Language = Language::Python;

    /// Parse a user-facing label (`python`, `javascript`, `java`, `c`, `c++`)
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            "c" => Some(Language::C),
            "c++" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// The label used on the wire and in the editor's selector
    pub fn label(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "c++",
        }
    }

    /// Runtime name understood by the sandbox
    pub fn runtime(self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::JavaScript => "node",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Name of the single source file submitted to the sandbox
    pub fn entry_filename(self) -> &'static str {
        match self {
            Language::Python => "code.py",
            Language::JavaScript => "code.js",
            Language::Java => "Main.java",
            Language::C => "code.c",
            Language::Cpp => "code.cpp",
        }
    }

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Detect a language from a file name's extension.
    ///
    /// Unknown or missing extensions fall back to Python, matching how
    /// attachments opened from chat are treated.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "py" => Language::Python,
            "js" => Language::JavaScript,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" => Language::Cpp,
            _ => Language::Python,
        }
    }

    /// Suggested file name when the buffer is saved to disk
    pub fn download_name(self) -> String {
        format!("code.{}", self.extension())
    }

    /// Starter program shown in a fresh personal session
    pub fn template(self) -> &'static str {
        match self {
            Language::Python => PYTHON_TEMPLATE,
            Language::JavaScript => JAVASCRIPT_TEMPLATE,
            Language::Java => JAVA_TEMPLATE,
            Language::C => C_TEMPLATE,
            Language::Cpp => CPP_TEMPLATE,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const PYTHON_TEMPLATE: &str = r#"print("Hello, world!")"#;

const JAVASCRIPT_TEMPLATE: &str = r#"console.log("Hello, world!");"#;

const JAVA_TEMPLATE: &str = r#"public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, world!");
    }
}"#;

const C_TEMPLATE: &str = r#"#include <stdio.h>

int main() {
    printf("Hello, world!");
    return 0;
}"#;

const CPP_TEMPLATE: &str = r#"#include <iostream>
using namespace std;

int main() {
    cout << "Hello, world!";
    return 0;
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_label(lang.label()), Some(lang));
        }
        assert_eq!(Language::from_label("rust"), None);
        assert_eq!(Language::from_label("cpp"), None);
        assert_eq!(Language::from_label("Python"), None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Language::Cpp).unwrap();
        assert_eq!(json, "\"c++\"");
        let parsed: Language = serde_json::from_str("\"javascript\"").unwrap();
        assert_eq!(parsed, Language::JavaScript);
        assert!(serde_json::from_str::<Language>("\"go\"").is_err());
    }

    #[test]
    fn test_file_name_detection() {
        assert_eq!(Language::from_file_name("main.cpp"), Language::Cpp);
        assert_eq!(Language::from_file_name("Main.java"), Language::Java);
        assert_eq!(Language::from_file_name("app.min.js"), Language::JavaScript);
        assert_eq!(Language::from_file_name("README"), Language::Python);
        assert_eq!(Language::from_file_name("notes.txt"), Language::Python);
    }

    #[test]
    fn test_download_name() {
        assert_eq!(Language::Cpp.download_name(), "code.cpp");
        assert_eq!(Language::Python.download_name(), "code.py");
    }

    #[test]
    fn test_java_template_declares_main() {
        assert!(Language::Java.template().contains("class Main"));
    }
}
