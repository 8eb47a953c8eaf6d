//! Entry catalog
//!
//! Read-only snapshot of the linkable entries for one rewrite pass. The
//! portal hydrates this from its store once per request; the engine never
//! queries anything itself.

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

fn default_public() -> bool {
    true
}

/// An alternate title for an entry, with its own page URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasDefinition {
    pub title: String,
    pub url: String,
}

/// One linkable entry as supplied by the portal store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDefinition {
    pub id: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub aliases: Vec<AliasDefinition>,
    #[serde(default = "default_public")]
    pub public: bool,
}

/// One snapshot row: display text plus target URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub text: String,
    pub url: String,
}

// =============================================================================
// EntryCatalog
// =============================================================================

/// In-memory catalog of linkable entries
#[derive(Debug, Clone, Default)]
pub struct EntryCatalog {
    entries: Vec<EntryDefinition>,
}

impl EntryCatalog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Replace the catalog contents
    pub fn hydrate(&mut self, entries: Vec<EntryDefinition>) {
        self.entries = entries;
    }

    /// Replace the catalog contents from a JSON array
    pub fn hydrate_json(&mut self, json: &str) -> Result<usize, String> {
        let entries: Vec<EntryDefinition> =
            serde_json::from_str(json).map_err(|e| format!("invalid entry JSON: {}", e))?;
        let count = entries.len();
        self.entries = entries;
        Ok(count)
    }

    pub fn add_entry(&mut self, entry: EntryDefinition) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Flatten to snapshot rows: canonical titles of public entries first,
    /// then their aliases, both in insertion order. The excluded entry and
    /// its aliases are skipped; non-public entries never appear.
    pub fn snapshot(&self, exclude: Option<u64>) -> Vec<LinkTarget> {
        let mut targets = Vec::new();

        for entry in &self.entries {
            if !entry.public || exclude == Some(entry.id) {
                continue;
            }
            targets.push(LinkTarget {
                text: entry.title.clone(),
                url: entry.url.clone(),
            });
        }
        for entry in &self.entries {
            if !entry.public || exclude == Some(entry.id) {
                continue;
            }
            for alias in &entry.aliases {
                targets.push(LinkTarget {
                    text: alias.title.clone(),
                    url: alias.url.clone(),
                });
            }
        }

        targets
    }
}

// =============================================================================
// Tests
// =============================================================================
