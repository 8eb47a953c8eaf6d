//! Candidate planning
//!
//! Orders a catalog snapshot into the sequence the rewriter tries:
//! longest display text first, so a title that contains a shorter title as
//! a substring consumes the span before the shorter one sees it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::LinkTarget;

// =============================================================================
// Types
// =============================================================================

/// One linkable pattern, ready for the rewriter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Trimmed display text, original casing
    pub display_text: String,
    pub target_url: String,
    /// Case-folded form; unique within one plan
    pub fold_key: String,
}

/// Case-fold a pattern the same way the rewriter folds documents:
/// char-wise lowercase, no locale rules.
pub(crate) fn fold(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

// =============================================================================
// MatchPlanner
// =============================================================================

/// Builds the ordered candidate plan for one rewrite pass
pub struct MatchPlanner;

impl MatchPlanner {
    /// Plan candidates from snapshot rows:
    /// 1. drop rows whose trimmed display text is empty
    /// 2. keep only the first row per case-folded key
    /// 3. stable-sort by descending display-text length in chars, so
    ///    equal-length candidates keep their snapshot order
    pub fn plan(targets: &[LinkTarget]) -> Vec<LinkCandidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<LinkCandidate> = Vec::with_capacity(targets.len());

        for target in targets {
            let text = target.text.trim();
            if text.is_empty() {
                continue;
            }
            let key = fold(text);
            if !seen.insert(key.clone()) {
                continue;
            }
            candidates.push(LinkCandidate {
                display_text: text.to_string(),
                target_url: target.url.clone(),
                fold_key: key,
            });
        }

        candidates.sort_by_cached_key(|c| std::cmp::Reverse(c.display_text.chars().count()));
        candidates
    }
}

// =============================================================================
// Tests
// =============================================================================
