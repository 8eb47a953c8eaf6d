//! Link markup construction
//!
//! Dialect-specific formatting of the final link fragment:
//! - HTML: `<a href="…" class="keyword-link" title="…">text</a>`
//! - Markdown: `[text](url "title")`
//!
//! The matched text is inserted verbatim (it keeps the casing found in the
//! document); the href and title are escaped for the target dialect.

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Markup dialect of the document being rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    Html,
    Markdown,
}

// =============================================================================
// Escaping
// =============================================================================

/// Escape text for a double-quoted HTML attribute value
pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a Markdown link destination.
///
/// Bare destinations cannot contain whitespace, so those are wrapped in
/// angle brackets; otherwise parens are backslash-escaped.
fn escape_markdown_dest(url: &str) -> String {
    if url.chars().any(char::is_whitespace) {
        let mut out = String::with_capacity(url.len() + 2);
        out.push('<');
        for ch in url.chars() {
            match ch {
                '<' => out.push_str("\\<"),
                '>' => out.push_str("\\>"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('>');
        out
    } else {
        let mut out = String::with_capacity(url.len());
        for ch in url.chars() {
            match ch {
                '(' => out.push_str("\\("),
                ')' => out.push_str("\\)"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out
    }
}

/// Escape a Markdown link title for double quotes.
///
/// Returns `None` when the title cannot be represented safely (control
/// characters); the caller omits the title in that case.
fn escape_markdown_title(title: &str) -> Option<String> {
    if title.chars().any(char::is_control) {
        return None;
    }
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    Some(out)
}

/// Escape matched text for a Markdown link label. Brackets would terminate
/// the label early; backslash escapes render identically.
fn escape_markdown_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '[' => out.push_str("\\["),
            ']' => out.push_str("\\]"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

// =============================================================================
// LinkMarkupBuilder
// =============================================================================

/// Builds the replacement fragment for one accepted occurrence
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMarkupBuilder;

impl LinkMarkupBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the dialect-appropriate link fragment.
    ///
    /// `matched_text` is the occurrence as it appears in the document;
    /// `title_text` is the candidate's canonical display text.
    pub fn build(&self, dialect: Dialect, matched_text: &str, title_text: &str, url: &str) -> String {
        match dialect {
            Dialect::Html => format!(
                "<a href=\"{}\" class=\"keyword-link\" title=\"{}\">{}</a>",
                escape_attr(url),
                escape_attr(title_text),
                matched_text
            ),
            Dialect::Markdown => {
                let label = escape_markdown_label(matched_text);
                let dest = escape_markdown_dest(url);
                match escape_markdown_title(title_text) {
                    Some(title) => format!("[{}]({} \"{}\")", label, dest, title),
                    None => format!("[{}]({})", label, dest),
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
