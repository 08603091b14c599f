//! Technical-content heuristic
//!
//! Decides whether an ambiguous inline element (`<kbd>`, `<samp>`, `<var>`,
//! `span.keyword`) holds technical content, rendered as inline code, or a UI
//! label, rendered bold.
//!
//! This is a heuristic, not a guarantee. Short mixed-case tokens have no
//! ground truth, so every rule can be switched off through
//! [`TechnicalHeuristics`]. The only contract is stability: the same input and
//! settings always classify the same way.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static FILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/|\./|\.\./|~/|[A-Za-z]:\\|\\\\)")
        .expect("BUG: hardcoded file path regex is valid")
});

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^<>\s][^<>]*>").expect("BUG: hardcoded placeholder regex is valid")
});

static DOMAIN_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\w\.(?:com|org|net|io|gov|edu|xml|json|js|ts|html?|css|txt|csv|sql|xsd|wsdl|jar|zip|log|yaml|yml|properties|do)\b",
    )
    .expect("BUG: hardcoded domain extension regex is valid")
});

static DOTTED_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$-]*(?:\.[A-Za-z_$][\w$-]*)+$")
        .expect("BUG: hardcoded dotted identifier regex is valid")
});

static CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("BUG: hardcoded constant regex is valid")
});

static CODE_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[{}\[\];]|\w\(").expect("BUG: hardcoded code punctuation regex is valid")
});

static SNAKE_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+$")
        .expect("BUG: hardcoded snake_case regex is valid")
});

static CAMEL_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+[A-Z][A-Za-z0-9]*$").expect("BUG: hardcoded camelCase regex is valid")
});

/// Switches and thresholds for [`TechnicalHeuristics::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalHeuristics {
    pub file_paths: bool,
    pub placeholders: bool,
    pub domain_extensions: bool,
    pub dotted_identifiers: bool,
    pub constants: bool,
    /// Minimum length of an ALL_CAPS token to count as a constant
    pub min_constant_len: usize,
    pub code_punctuation: bool,
    pub identifier_shapes: bool,
}

impl Default for TechnicalHeuristics {
    fn default() -> Self {
        Self {
            file_paths: true,
            placeholders: true,
            domain_extensions: true,
            dotted_identifiers: true,
            constants: true,
            min_constant_len: 4,
            code_punctuation: true,
            identifier_shapes: true,
        }
    }
}

impl TechnicalHeuristics {
    /// `true` when `text` looks like code rather than a UI label.
    pub fn classify(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        if self.file_paths && FILE_PATH.is_match(text) {
            return true;
        }
        if self.placeholders && PLACEHOLDER.is_match(text) {
            return true;
        }
        if self.domain_extensions && DOMAIN_EXTENSION.is_match(text) {
            return true;
        }
        if self.code_punctuation && CODE_PUNCTUATION.is_match(text) {
            return true;
        }

        // Remaining rules describe a single token
        if text.contains(char::is_whitespace) {
            return false;
        }

        if self.dotted_identifiers && DOTTED_IDENTIFIER.is_match(text) {
            return true;
        }
        if self.constants
            && text.chars().count() >= self.min_constant_len
            && CONSTANT.is_match(text)
        {
            return true;
        }
        self.identifier_shapes && (SNAKE_CASE.is_match(text) || CAMEL_CASE.is_match(text))
    }
}

/// Classify with the default heuristics.
pub fn is_technical(text: &str) -> bool {
    TechnicalHeuristics::default().classify(text)
}
