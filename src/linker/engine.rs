//! AutoLinker: engine facade
//!
//! One hydrate, then one call per rendered document:
//! 1. snapshot the catalog (minus the entry being rendered)
//! 2. plan candidates (dedup + longest-first)
//! 3. compile and run the rewrite pass
//!
//! Designed for WASM with a single cross-boundary call per document.

use instant::Instant;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use super::catalog::{EntryCatalog, EntryDefinition};
use super::markup::Dialect;
use super::planner::MatchPlanner;
use super::rewriter::{LinkRewriter, RewriteStats};

// =============================================================================
// Types
// =============================================================================

/// Counters and per-phase timings for one link pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub candidates: usize,
    pub occurrences: usize,
    pub inserted: usize,
    pub skipped_overlap: usize,
    pub skipped_context: usize,
    pub plan_us: u64,
    pub rewrite_us: u64,
    pub total_us: u64,
}

/// Result of one link pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub output: String,
    pub stats: LinkStats,
}

// =============================================================================
// AutoLinker
// =============================================================================

/// Content auto-linking engine
#[wasm_bindgen]
pub struct AutoLinker {
    catalog: EntryCatalog,
}

impl Default for AutoLinker {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl AutoLinker {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            catalog: EntryCatalog::new(),
        }
    }

    /// Number of hydrated entries
    #[wasm_bindgen(js_name = entryCount)]
    pub fn entry_count(&self) -> usize {
        self.catalog.len()
    }

    /// Drop all hydrated entries (JS binding)
    #[wasm_bindgen(js_name = clear)]
    pub fn js_clear(&mut self) {
        self.clear();
    }

    /// Hydrate the catalog (JS binding)
    #[wasm_bindgen(js_name = hydrateEntries)]
    pub fn js_hydrate_entries(&mut self, entries: JsValue) -> Result<(), JsValue> {
        let entries: Vec<EntryDefinition> = serde_wasm_bindgen::from_value(entries)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse entries: {}", e)))?;
        self.catalog.hydrate(entries);
        Ok(())
    }

    /// Hydrate the catalog from a JSON array string (JS binding)
    #[wasm_bindgen(js_name = hydrateEntriesJson)]
    pub fn js_hydrate_entries_json(&mut self, json: &str) -> Result<usize, JsValue> {
        self.hydrate_entries_json(json).map_err(|e| JsValue::from_str(&e))
    }

    /// Link known titles in rendered HTML (JS binding)
    #[wasm_bindgen(js_name = linkHtml)]
    pub fn js_link_html(&self, document: &str, exclude_id: Option<u32>) -> JsValue {
        self.outcome_to_js(self.link(document, Dialect::Html, exclude_id.map(u64::from)))
    }

    /// Link known titles in raw Markdown (JS binding)
    #[wasm_bindgen(js_name = linkMarkdown)]
    pub fn js_link_markdown(&self, document: &str, exclude_id: Option<u32>) -> JsValue {
        self.outcome_to_js(self.link(document, Dialect::Markdown, exclude_id.map(u64::from)))
    }
}

impl AutoLinker {
    /// Hydrate the catalog
    pub fn hydrate_entries(&mut self, entries: Vec<EntryDefinition>) {
        self.catalog.hydrate(entries);
    }

    /// Hydrate the catalog from a JSON array string
    pub fn hydrate_entries_json(&mut self, json: &str) -> Result<usize, String> {
        self.catalog.hydrate_json(json)
    }

    /// Add one entry
    pub fn add_entry(&mut self, entry: EntryDefinition) {
        self.catalog.add_entry(entry);
    }

    /// Drop all hydrated entries
    pub fn clear(&mut self) {
        self.catalog.clear();
    }

    /// Run one link pass over a document.
    ///
    /// `exclude` is the id of the entry being rendered, so a page never
    /// links to itself.
    pub fn link(&self, document: &str, dialect: Dialect, exclude: Option<u64>) -> LinkOutcome {
        let overall = Instant::now();

        let plan_start = Instant::now();
        let snapshot = self.catalog.snapshot(exclude);
        let plan = MatchPlanner::plan(&snapshot);
        let rewriter = LinkRewriter::compile(plan);
        let plan_us = plan_start.elapsed().as_micros() as u64;

        let rewrite_start = Instant::now();
        let outcome = rewriter.rewrite(document, dialect);
        let rewrite_us = rewrite_start.elapsed().as_micros() as u64;

        let RewriteStats {
            candidates,
            occurrences,
            inserted,
            skipped_overlap,
            skipped_context,
        } = outcome.stats;

        LinkOutcome {
            output: outcome.output,
            stats: LinkStats {
                candidates,
                occurrences,
                inserted,
                skipped_overlap,
                skipped_context,
                plan_us,
                rewrite_us,
                total_us: overall.elapsed().as_micros() as u64,
            },
        }
    }

    /// Link known titles in rendered HTML
    pub fn link_html(&self, document: &str, exclude: Option<u64>) -> LinkOutcome {
        self.link(document, Dialect::Html, exclude)
    }

    /// Link known titles in raw Markdown
    pub fn link_markdown(&self, document: &str, exclude: Option<u64>) -> LinkOutcome {
        self.link(document, Dialect::Markdown, exclude)
    }

    fn outcome_to_js(&self, outcome: LinkOutcome) -> JsValue {
        match serde_wasm_bindgen::to_value(&outcome) {
            Ok(v) => v,
            Err(e) => {
                web_sys::console::error_1(
                    &format!("[AutoLinker] Serialization failed: {:?}", e).into(),
                );
                JsValue::NULL
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
