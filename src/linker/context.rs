//! Markup context classification
//!
//! Answers "what markup construct is byte offset N inside?" for one
//! document, so the rewriter never inserts a link where it would corrupt
//! structure:
//! - HTML: tag interiors, quoted attribute values, open `<a>` bodies
//! - Markdown: inline-link labels and targets, image labels, code regions
//!
//! The whole document is classified with one forward scan; lookups then
//! binary-search the resulting runs. Unterminated constructs classify to
//! the end of the document, so ambiguous trailing regions are never linked.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::markup::Dialect;

// =============================================================================
// Types
// =============================================================================

/// Markup context of a single byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupContext {
    /// Plain text; a link may be inserted here
    Free,
    /// Between the `<` and `>` of a tag
    InsideTag,
    /// Inside a quoted attribute value
    InsideAttribute,
    /// Between an open `<a …>` and its `</a>`
    InsideAnchorBody,
    /// Inside the `[…]` label of an inline Markdown link
    InsideMarkdownLinkLabel,
    /// Inside the `(…)` target of an inline Markdown link
    InsideMarkdownLinkTarget,
    /// Inside the `![…]` label of a Markdown image
    InsideMarkdownImageMarker,
    /// Inside a fenced code block or backtick code span
    InsideCodeSpan,
}

// =============================================================================
// ContextIndex
// =============================================================================

/// Per-document classification index
pub struct ContextIndex {
    /// Classification runs as (start offset, context); the first run starts
    /// at offset 0 and starts are strictly increasing
    runs: Vec<(usize, MarkupContext)>,
    len: usize,
}

impl ContextIndex {
    /// Classify a whole document with one forward scan
    pub fn build(document: &str, dialect: Dialect) -> Self {
        let map = match dialect {
            Dialect::Html => classify_html(document),
            Dialect::Markdown => classify_markdown(document),
        };

        let mut runs = Vec::new();
        let mut previous = None;
        for (offset, context) in map.iter().enumerate() {
            if previous != Some(*context) {
                runs.push((offset, *context));
                previous = Some(*context);
            }
        }
        if runs.is_empty() {
            runs.push((0, MarkupContext::Free));
        }

        ContextIndex { runs, len: document.len() }
    }

    /// Classify one byte offset. Offsets at or past the end of the document
    /// take the final run's context.
    pub fn classify(&self, offset: usize) -> MarkupContext {
        let idx = self.runs.partition_point(|&(start, _)| start <= offset);
        self.runs[idx - 1].1
    }

    /// True when a replacement spanning `start..end` is allowed: both the
    /// first and the last byte must sit in free text.
    pub fn allows(&self, start: usize, end: usize) -> bool {
        debug_assert!(start < end && end <= self.len, "bad span {}..{}", start, end);
        self.classify(start) == MarkupContext::Free
            && self.classify(end - 1) == MarkupContext::Free
    }
}

// =============================================================================
// HTML classification
// =============================================================================

enum TagKind {
    AnchorOpen,
    AnchorClose,
    Other,
}

/// Identify a terminated tag, given its full `<…>` bytes
fn read_tag_kind(tag: &[u8]) -> TagKind {
    let inner = &tag[1..tag.len() - 1];
    let (closing, name_start) = match inner.first() {
        Some(b'/') => (true, 1),
        _ => (false, 0),
    };

    let mut name_end = name_start;
    while name_end < inner.len() && inner[name_end].is_ascii_alphanumeric() {
        name_end += 1;
    }
    if !inner[name_start..name_end].eq_ignore_ascii_case(b"a") {
        return TagKind::Other;
    }
    if closing {
        return TagKind::AnchorClose;
    }
    // `<a/>` opens no body. A trailing `/` after an unquoted attribute value
    // is ambiguous (`<a href=/x/>`); ambiguous tags count as open anchors.
    let trimmed = inner.trim_ascii_end();
    let self_closing = trimmed.last() == Some(&b'/')
        && (trimmed.len() - 1 == name_end
            || matches!(
                trimmed[..trimmed.len() - 1].last(),
                Some(b'"') | Some(b'\'') | Some(b' ') | Some(b'\t')
            ));
    if self_closing {
        TagKind::Other
    } else {
        TagKind::AnchorOpen
    }
}

fn classify_html(document: &str) -> Vec<MarkupContext> {
    let bytes = document.as_bytes();
    let mut map = vec![MarkupContext::Free; bytes.len()];
    let mut in_anchor = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            if in_anchor {
                map[i] = MarkupContext::InsideAnchorBody;
            }
            i += 1;
            continue;
        }

        // Tag region: from `<` to the first `>` outside quotes, or to the
        // end of the document when unterminated.
        let tag_start = i;
        let mut quote: Option<u8> = None;
        let mut close = None;
        let mut j = i + 1;
        while j < bytes.len() {
            let b = bytes[j];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    } else {
                        map[j] = MarkupContext::InsideAttribute;
                    }
                }
                None => {
                    if b == b'"' || b == b'\'' {
                        quote = Some(b);
                    } else if b == b'>' {
                        close = Some(j);
                        break;
                    }
                }
            }
            j += 1;
        }

        let tag_end = close.map_or(bytes.len(), |c| c + 1);
        for k in tag_start..tag_end {
            if map[k] != MarkupContext::InsideAttribute {
                map[k] = MarkupContext::InsideTag;
            }
        }

        // Only a terminated tag changes anchor state
        if close.is_some() {
            match read_tag_kind(&bytes[tag_start..tag_end]) {
                TagKind::AnchorOpen => in_anchor = true,
                TagKind::AnchorClose => in_anchor = false,
                TagKind::Other => {}
            }
        }
        i = tag_end;
    }

    map
}

// =============================================================================
// Markdown classification
// =============================================================================

/// Fenced code blocks (``` or ~~~, unterminated ones run to end of input)
/// and backtick code spans. A lone unmatched backtick stays literal text.
static CODE_REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^(?:```|~~~).*?(?:^(?:```|~~~)[^\n]*(?:\n|\z)|\z)|`[^`]+`")
        .expect("code region regex")
});

fn classify_markdown(document: &str) -> Vec<MarkupContext> {
    let bytes = document.as_bytes();
    let mut map = vec![MarkupContext::Free; bytes.len()];

    for region in CODE_REGION_RE.find_iter(document) {
        for k in region.start()..region.end() {
            map[k] = MarkupContext::InsideCodeSpan;
        }
    }

    let mut i = 0;
    while i < bytes.len() {
        if map[i] == MarkupContext::InsideCodeSpan {
            i += 1;
            continue;
        }
        match bytes[i] {
            // An escaped char never opens a construct
            b'\\' => i += 2,
            b'[' => match mark_inline_link(bytes, &mut map, i) {
                Some(resume) => i = resume,
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    map
}

/// Mark an inline link (or image) whose label opens at the `[` at `open`.
/// Returns the offset to resume scanning from, or `None` when the bracket
/// does not begin inline-link syntax.
fn mark_inline_link(bytes: &[u8], map: &mut [MarkupContext], open: usize) -> Option<usize> {
    let is_image = open > 0 && bytes[open - 1] == b'!';
    let label_context = if is_image {
        MarkupContext::InsideMarkdownImageMarker
    } else {
        MarkupContext::InsideMarkdownLinkLabel
    };

    // Find the matching `]`, honoring escapes, nesting and code spans
    let mut depth = 0usize;
    let mut label_close = None;
    let mut j = open;
    while j < bytes.len() {
        if map[j] == MarkupContext::InsideCodeSpan {
            j += 1;
            continue;
        }
        match bytes[j] {
            b'\\' => j += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    label_close = Some(j);
                    break;
                }
            }
            _ => {}
        }
        j += 1;
    }

    let label_close = match label_close {
        Some(c) => c,
        None => {
            // Unterminated label: classify to end of input
            for k in open..bytes.len() {
                map[k] = label_context;
            }
            if is_image {
                map[open - 1] = label_context;
            }
            return Some(bytes.len());
        }
    };

    // `](` is what makes this link syntax; a bare bracket pair stays text
    if label_close + 1 >= bytes.len() || bytes[label_close + 1] != b'(' {
        return None;
    }

    for k in open..=label_close {
        map[k] = label_context;
    }
    if is_image {
        map[open - 1] = label_context;
    }

    // Target: from `(` to the matching unescaped `)`
    let mut depth = 0usize;
    let mut target_close = None;
    let mut j = label_close + 1;
    while j < bytes.len() {
        if map[j] == MarkupContext::InsideCodeSpan {
            j += 1;
            continue;
        }
        match bytes[j] {
            b'\\' => j += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    target_close = Some(j);
                    break;
                }
            }
            _ => {}
        }
        j += 1;
    }

    // Unterminated targets classify to end of input
    let target_end = target_close.map_or(bytes.len(), |c| c + 1);
    for k in (label_close + 1)..target_end {
        map[k] = MarkupContext::InsideMarkdownLinkTarget;
    }
    Some(target_end)
}

// =============================================================================
// Tests
// =============================================================================
