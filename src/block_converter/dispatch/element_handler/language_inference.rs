//! Language detection for code blocks
//!
//! Class hints (`language-js`, `lang-xml`, `brush: sql`, ...) win. Without a
//! hint, a handful of definitive content markers are checked. Everything is
//! mapped onto the language names the target format accepts.

/// Extract a raw language hint from a class attribute.
pub fn extract_language_from_class(class: &str) -> Option<String> {
    let mut parts = class.split_whitespace().peekable();
    while let Some(part) = parts.next() {
        for prefix in ["language-", "lang-", "hljs-"] {
            if let Some(lang) = part.strip_prefix(prefix)
                && !lang.is_empty()
            {
                return Some(lang.to_ascii_lowercase());
            }
        }
        // SyntaxHighlighter: "brush:js" or "brush: js"
        if let Some(lang) = part.strip_prefix("brush:") {
            let lang = if lang.is_empty() {
                parts.peek().copied().unwrap_or_default()
            } else {
                lang
            };
            let lang = lang.trim_end_matches(';');
            if !lang.is_empty() {
                return Some(lang.to_ascii_lowercase());
            }
        }
    }
    None
}

/// Map a hint onto a supported language name, or `None` when unknown.
pub fn normalize_language(hint: &str) -> Option<&'static str> {
    let lang = match hint.trim().to_ascii_lowercase().as_str() {
        "js" | "javascript" | "jscript" | "ecmascript" | "glide" | "servicenow" => "javascript",
        "ts" | "typescript" => "typescript",
        "json" => "json",
        "xml" | "xsd" | "wsdl" | "soap" => "xml",
        "html" | "htm" | "xhtml" => "html",
        "css" => "css",
        "sql" => "sql",
        "sh" | "shell" | "console" => "shell",
        "bash" => "bash",
        "ps" | "ps1" | "powershell" => "powershell",
        "py" | "python" => "python",
        "java" => "java",
        "groovy" => "groovy",
        "yaml" | "yml" => "yaml",
        "c#" | "csharp" | "cs" => "c#",
        "go" | "golang" => "go",
        "ruby" | "rb" => "ruby",
        "rust" | "rs" => "rust",
        "markdown" | "md" => "markdown",
        "graphql" => "graphql",
        "text" | "plain" | "plaintext" | "txt" | "none" => "plain text",
        _ => return None,
    };
    Some(lang)
}

/// Definitive content markers only; ambiguous content stays undetected.
pub fn infer_language_from_content(code: &str) -> Option<&'static str> {
    let trimmed = code.trim();
    if trimmed.len() < 5 {
        return None;
    }

    if trimmed.starts_with("#!/bin/bash") || trimmed.starts_with("#!/usr/bin/env bash") {
        return Some("bash");
    }
    if trimmed.starts_with("#!/bin/sh") {
        return Some("shell");
    }
    if trimmed.starts_with("<?xml") {
        return Some("xml");
    }
    if trimmed.starts_with("<!DOCTYPE html") || trimmed.starts_with("<html") {
        return Some("html");
    }
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if bracketed && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some("json");
    }
    if trimmed.contains("new GlideRecord(")
        || trimmed.contains("gs.info(")
        || trimmed.contains("gs.log(")
        || trimmed.contains("g_form.")
        || trimmed.contains("function(")
        || trimmed.contains("function (")
    {
        return Some("javascript");
    }
    if trimmed.starts_with("SELECT ") || trimmed.starts_with("select ") {
        return Some("sql");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_hints() {
        assert_eq!(extract_language_from_class("pre language-JS"), Some("js".into()));
        assert_eq!(extract_language_from_class("brush: sql;"), Some("sql".into()));
        assert_eq!(extract_language_from_class("pre codeblock"), None);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_language("js"), Some("javascript"));
        assert_eq!(normalize_language("YML"), Some("yaml"));
        assert_eq!(normalize_language("klingon"), None);
    }

    #[test]
    fn content_markers() {
        assert_eq!(
            infer_language_from_content("var gr = new GlideRecord('incident');"),
            Some("javascript")
        );
        assert_eq!(infer_language_from_content(r#"{"a": 1}"#), Some("json"));
        assert_eq!(infer_language_from_content("<?xml version=\"1.0\"?><a/>"), Some("xml"));
        assert_eq!(infer_language_from_content("just words here"), None);
    }
}
