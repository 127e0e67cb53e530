use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// A fenced snippet extracted from an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub filename: String,
    pub code: String,
}

impl CodeBlock {
    pub fn new(
        language: impl Into<String>,
        filename: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            filename: filename.into(),
            code: code.into(),
        }
    }

    /// Extract fenced code blocks from markdown.
    ///
    /// Recognises fences of the form:
    ///
    /// ````text
    /// ```tsx
    /// // filename: Navbar.tsx
    /// ...code...
    /// ```
    /// ````
    ///
    /// The filename comment is optional; without it a name is derived from
    /// the language. Fences without a language tag are ignored.
    pub fn extract(text: &str) -> Vec<CodeBlock> {
        let pattern = FENCE_PATTERN.get_or_init(|| {
            Regex::new(r"(?s)```(\w+)\s*\n(?://\s*filename:\s*(\S+)\s*\n)?(.*?)```")
                .expect("Invalid code fence regex pattern")
        });

        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let language = caps.get(1)?.as_str().trim().to_string();
                let filename = caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| default_filename(&language));
                let code = caps.get(3)?.as_str().trim().to_string();
                Some(CodeBlock {
                    language,
                    filename,
                    code,
                })
            })
            .collect()
    }
}

fn default_filename(language: &str) -> String {
    match language {
        "tsx" => "Component.tsx".to_string(),
        "ts" => "module.ts".to_string(),
        "jsx" => "Component.jsx".to_string(),
        "js" => "module.js".to_string(),
        "css" => "styles.css".to_string(),
        "html" => "index.html".to_string(),
        other => format!("file.{}", other),
    }
}
