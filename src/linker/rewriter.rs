//! Link rewriting pass
//!
//! Plan-then-apply substitution:
//! 1. collect every candidate occurrence against a case-folded shadow of
//!    the immutable original document (one Aho-Corasick pass)
//! 2. accept occurrences in candidate priority order, rejecting overlaps
//!    with already-consumed spans and non-free markup contexts
//! 3. apply all replacements right-to-left, so recorded offsets stay valid
//!
//! The pass is a pure function of (document, plan): running it again over
//! its own output changes nothing, because every inserted fragment
//! classifies as non-free on the next pass.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};

use super::context::ContextIndex;
use super::markup::{Dialect, LinkMarkupBuilder};
use super::planner::LinkCandidate;

// =============================================================================
// Types
// =============================================================================

/// Half-open byte range over the original document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted span {}..{}", start, end);
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Counters for one rewrite pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriteStats {
    pub candidates: usize,
    /// Occurrences considered (after case-fold boundary filtering)
    pub occurrences: usize,
    pub inserted: usize,
    pub skipped_overlap: usize,
    pub skipped_context: usize,
}

/// Result of one rewrite pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub output: String,
    pub stats: RewriteStats,
}

// =============================================================================
// Case folding
// =============================================================================

/// Case-folded shadow of a document, with a map from folded byte offsets
/// back to original byte offsets.
struct FoldedText {
    folded: String,
    /// offsets[i] = original offset of the char that produced folded byte i,
    /// plus one trailing sentinel equal to the original length
    offsets: Vec<usize>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (original, ch) in text.char_indices() {
            for lower in ch.to_lowercase() {
                folded.push(lower);
                offsets.resize(folded.len(), original);
            }
        }
        offsets.push(text.len());
        FoldedText { folded, offsets }
    }

    /// Map a folded-space span back to the original document. `None` when
    /// an endpoint cuts through a multi-char case expansion (`İ` → `i̇`).
    fn to_original(&self, start: usize, end: usize) -> Option<Span> {
        if !self.is_boundary(start) || !self.is_boundary(end) {
            return None;
        }
        Some(Span::new(self.offsets[start], self.offsets[end]))
    }

    fn is_boundary(&self, folded_offset: usize) -> bool {
        folded_offset == 0 || self.offsets[folded_offset] != self.offsets[folded_offset - 1]
    }
}

// =============================================================================
// LinkRewriter
// =============================================================================

/// Substitution pass for one compiled candidate plan
pub struct LinkRewriter {
    candidates: Vec<LinkCandidate>,
    automaton: Option<AhoCorasick>,
    builder: LinkMarkupBuilder,
}

impl LinkRewriter {
    /// Compile a candidate plan. An empty plan (or a pattern set the
    /// automaton cannot hold) compiles to a rewriter that passes documents
    /// through unchanged.
    pub fn compile(candidates: Vec<LinkCandidate>) -> Self {
        let automaton = if candidates.is_empty() {
            None
        } else {
            AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(candidates.iter().map(|c| c.fold_key.as_str()))
                .ok()
        };
        Self {
            candidates,
            automaton,
            builder: LinkMarkupBuilder::new(),
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Rewrite one document
    pub fn rewrite(&self, document: &str, dialect: Dialect) -> RewriteOutcome {
        let mut stats = RewriteStats {
            candidates: self.candidates.len(),
            ..Default::default()
        };

        let automaton = match &self.automaton {
            Some(a) if !document.is_empty() => a,
            _ => {
                return RewriteOutcome {
                    output: document.to_string(),
                    stats,
                }
            }
        };

        // Phase 1: every occurrence of every candidate, grouped by candidate.
        // Overlapping matches are wanted here; priority is decided below, not
        // by the automaton.
        let folded = FoldedText::new(document);
        let mut occurrences: Vec<Vec<Span>> = vec![Vec::new(); self.candidates.len()];
        for m in automaton.find_overlapping_iter(&folded.folded) {
            if let Some(span) = folded.to_original(m.start(), m.end()) {
                occurrences[m.pattern().as_usize()].push(span);
            }
        }

        // Phase 2: accept in candidate priority order, document order within
        // one candidate. A span overlapping anything already consumed, or
        // touching non-free markup at either endpoint, is dropped.
        let context = ContextIndex::build(document, dialect);
        let mut accepted: Vec<(Span, usize)> = Vec::new();
        for (candidate_idx, spans) in occurrences.iter_mut().enumerate() {
            spans.sort_by_key(|s| s.start);
            for span in spans.iter() {
                stats.occurrences += 1;
                if accepted.iter().any(|(consumed, _)| consumed.overlaps(span)) {
                    stats.skipped_overlap += 1;
                    continue;
                }
                if !context.allows(span.start, span.end) {
                    stats.skipped_context += 1;
                    continue;
                }
                accepted.push((*span, candidate_idx));
            }
        }

        // Phase 3: apply right-to-left against the original text.
        accepted.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        if cfg!(debug_assertions) {
            for pair in accepted.windows(2) {
                debug_assert!(pair[1].0.end <= pair[0].0.start, "interleaved replacements");
            }
        }

        let mut output = document.to_string();
        for (span, candidate_idx) in &accepted {
            let candidate = &self.candidates[*candidate_idx];
            let matched = &document[span.start..span.end];
            let fragment = self.builder.build(
                dialect,
                matched,
                &candidate.display_text,
                &candidate.target_url,
            );
            output.replace_range(span.start..span.end, &fragment);
        }
        stats.inserted = accepted.len();

        RewriteOutcome { output, stats }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, url: &str) -> LinkCandidate {
        LinkCandidate {
            display_text: text.to_string(),
            target_url: url.to_string(),
            fold_key: crate::linker::planner::fold(text),
        }
    }

    fn rewrite_html(document: &str, candidates: Vec<LinkCandidate>) -> RewriteOutcome {
        LinkRewriter::compile(candidates).rewrite(document, Dialect::Html)
    }

    fn rewrite_markdown(document: &str, candidates: Vec<LinkCandidate>) -> RewriteOutcome {
        LinkRewriter::compile(candidates).rewrite(document, Dialect::Markdown)
    }

    // -------------------------------------------------------------------------
    // Basics
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_plan_passes_document_through() {
        let outcome = rewrite_html("any text", vec![]);
        assert_eq!(outcome.output, "any text");
        assert_eq!(outcome.stats.inserted, 0);
    }

    #[test]
    fn test_empty_document_passes_through() {
        let outcome = rewrite_html("", vec![candidate("Python", "/p")]);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_single_occurrence_linked() {
        let outcome = rewrite_html("about Python here", vec![candidate("Python", "/cat/python")]);
        assert_eq!(
            outcome.output,
            "about <a href=\"/cat/python\" class=\"keyword-link\" title=\"Python\">Python</a> here"
        );
        assert_eq!(outcome.stats.inserted, 1);
    }

    #[test]
    fn test_multiple_occurrences_all_linked() {
        let outcome = rewrite_html("Python and Python", vec![candidate("Python", "/p")]);
        assert_eq!(outcome.output.matches("</a>").count(), 2);
    }

    #[test]
    fn test_unmatched_regions_unchanged() {
        let document = "prefix Python suffix";
        let outcome = rewrite_html(document, vec![candidate("Python", "/p")]);
        assert!(outcome.output.starts_with("prefix "));
        assert!(outcome.output.ends_with(" suffix"));
    }

    // -------------------------------------------------------------------------
    // Case handling
    // -------------------------------------------------------------------------

    #[test]
    fn test_case_insensitive_match_preserves_document_casing() {
        let outcome = rewrite_html("PYTHON is popular", vec![candidate("python", "/cat/python")]);
        assert!(outcome.output.contains(">PYTHON</a>"));
        assert!(outcome.output.contains("title=\"python\""));
    }

    #[test]
    fn test_non_ascii_case_insensitive_match() {
        let outcome = rewrite_html("про РУСТ тут", vec![candidate("руст", "/r")]);
        assert!(outcome.output.contains(">РУСТ</a>"));
    }

    #[test]
    fn test_cjk_substring_match_without_word_boundaries() {
        // No whitespace anywhere; substring semantics must still apply
        let outcome = rewrite_html("本文介紹遞迴的概念", vec![candidate("遞迴", "/a/recursion")]);
        assert!(outcome.output.contains(">遞迴</a>"));
    }

    #[test]
    fn test_case_expansion_boundary_is_rejected() {
        // 'İ' lowercases to two chars; a bare "i" must not match inside it
        let outcome = rewrite_html("İstanbul", vec![candidate("i", "/i")]);
        assert_eq!(outcome.output, "İstanbul");
    }

    // -------------------------------------------------------------------------
    // Conflict resolution
    // -------------------------------------------------------------------------

    #[test]
    fn test_longest_candidate_wins_contained_shorter() {
        let outcome = rewrite_html(
            "a Neural Network classifier",
            vec![candidate("Neural Network", "/nn"), candidate("Network", "/n")],
        );
        assert!(outcome.output.contains(">Neural Network</a>"));
        assert!(!outcome.output.contains("href=\"/n\""));
        assert_eq!(outcome.stats.inserted, 1);
        assert_eq!(outcome.stats.skipped_overlap, 1);
    }

    #[test]
    fn test_shorter_candidate_still_matches_elsewhere() {
        let outcome = rewrite_html(
            "Neural Network beats a plain Network",
            vec![candidate("Neural Network", "/nn"), candidate("Network", "/n")],
        );
        assert!(outcome.output.contains("href=\"/nn\""));
        assert!(outcome.output.contains("href=\"/n\""));
        assert_eq!(outcome.stats.inserted, 2);
    }

    #[test]
    fn test_same_candidate_occurrences_do_not_overlap() {
        let outcome = rewrite_html("aaa", vec![candidate("aa", "/a")]);
        // Left occurrence wins; the shifted one is consumed
        assert_eq!(
            outcome.output,
            "<a href=\"/a\" class=\"keyword-link\" title=\"aa\">aa</a>a"
        );
        assert_eq!(outcome.stats.skipped_overlap, 1);
    }

    #[test]
    fn test_alias_and_canonical_link_to_distinct_urls() {
        let outcome = rewrite_html(
            "Recursion is a Recursive Function technique",
            vec![
                candidate("Recursive Function", "/a/recursive-function"),
                candidate("Recursion", "/a/recursion"),
            ],
        );
        assert!(outcome.output.contains("href=\"/a/recursion\""));
        assert!(outcome.output.contains("href=\"/a/recursive-function\""));
        assert_eq!(outcome.stats.inserted, 2);
    }

    // -------------------------------------------------------------------------
    // Markup safety (HTML)
    // -------------------------------------------------------------------------

    #[test]
    fn test_attribute_value_never_linked() {
        let document = r#"<img alt="Neural Network">text about Neural Network</img>"#;
        let outcome = rewrite_html(document, vec![candidate("Neural Network", "/nn")]);
        assert!(outcome.output.starts_with(r#"<img alt="Neural Network">"#));
        assert_eq!(outcome.output.matches("<a ").count(), 1);
        assert_eq!(outcome.stats.skipped_context, 1);
    }

    #[test]
    fn test_existing_anchor_body_never_linked() {
        let document = r#"<a href="/old">Python</a> and Python"#;
        let outcome = rewrite_html(document, vec![candidate("Python", "/new")]);
        assert!(outcome.output.starts_with(r#"<a href="/old">Python</a>"#));
        assert_eq!(outcome.output.matches("<a ").count(), 2);
    }

    #[test]
    fn test_unterminated_tag_region_never_linked() {
        let document = "ok Python <img src=broken Python";
        let outcome = rewrite_html(document, vec![candidate("Python", "/p")]);
        // The occurrence before the tag links; the one inside does not
        assert_eq!(outcome.output.matches("</a>").count(), 1);
        assert!(outcome.output.ends_with("<img src=broken Python"));
    }

    #[test]
    fn test_html_idempotent() {
        let candidates = || vec![candidate("Neural Network", "/nn"), candidate("Python", "/p")];
        let document = "Python builds a Neural Network";
        let once = rewrite_html(document, candidates());
        let twice = rewrite_html(&once.output, candidates());
        assert_eq!(once.output, twice.output);
        assert_eq!(twice.stats.inserted, 0);
    }

    // -------------------------------------------------------------------------
    // Markup safety (Markdown)
    // -------------------------------------------------------------------------

    #[test]
    fn test_markdown_occurrence_linked() {
        let outcome = rewrite_markdown("about Python here", vec![candidate("Python", "/cat/python")]);
        assert_eq!(outcome.output, "about [Python](/cat/python \"Python\") here");
    }

    #[test]
    fn test_markdown_existing_link_label_untouched() {
        let document = "[Python](/old \"x\") and Python";
        let outcome = rewrite_markdown(document, vec![candidate("Python", "/new")]);
        assert!(outcome.output.starts_with("[Python](/old \"x\")"));
        assert!(outcome.output.ends_with("[Python](/new \"Python\")"));
    }

    #[test]
    fn test_markdown_image_label_untouched() {
        let document = "![Python](/img/p.png) shows Python";
        let outcome = rewrite_markdown(document, vec![candidate("Python", "/p")]);
        assert!(outcome.output.starts_with("![Python](/img/p.png)"));
        assert_eq!(outcome.output.matches("](/p ").count(), 1);
    }

    #[test]
    fn test_markdown_code_regions_untouched() {
        let document = "```\nPython\n```\ncall `Python` or Python";
        let outcome = rewrite_markdown(document, vec![candidate("Python", "/p")]);
        assert!(outcome.output.starts_with("```\nPython\n```\ncall `Python` or "));
        assert_eq!(outcome.output.matches("](/p ").count(), 1);
    }

    #[test]
    fn test_markdown_idempotent() {
        let candidates = || {
            vec![
                candidate("Recursive Function", "/a/recursive-function"),
                candidate("Recursion", "/a/recursion"),
            ]
        };
        let document = "Recursion is a Recursive Function technique";
        let once = rewrite_markdown(document, candidates());
        let twice = rewrite_markdown(&once.output, candidates());
        assert_eq!(once.output, twice.output);
        assert_eq!(twice.stats.inserted, 0);
    }

    #[test]
    fn test_markdown_brackets_stay_balanced() {
        let document = "Python, [Python](/old), and `Python`";
        let outcome = rewrite_markdown(document, vec![candidate("Python", "/p")]);
        let opens = outcome.output.matches('[').count();
        let closes = outcome.output.matches(']').count();
        assert_eq!(opens, closes);
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    #[test]
    fn test_stats_account_for_every_occurrence() {
        let document = r#"<img alt="Python">Python Python"#;
        let outcome = rewrite_html(document, vec![candidate("Python", "/p")]);
        assert_eq!(outcome.stats.candidates, 1);
        assert_eq!(outcome.stats.occurrences, 3);
        assert_eq!(outcome.stats.inserted, 2);
        assert_eq!(outcome.stats.skipped_context, 1);
        assert_eq!(outcome.stats.skipped_overlap, 0);
    }
}
