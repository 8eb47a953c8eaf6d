//! LinkCore: Automatic Content-Linking Engine
//!
//! A Rust/WASM implementation of the portal's keyword auto-linking pass:
//! every occurrence of a known entry title or alias in a rendered document
//! is wrapped in a link to that entry's page, without corrupting markup,
//! without nesting links, and idempotently.
//!
//! # Architecture
//!
//! - `linker/catalog.rs` - EntryCatalog: snapshot of linkable titles and aliases
//! - `linker/planner.rs` - MatchPlanner: dedup + longest-first candidate ordering
//! - `linker/context.rs` - ContextIndex: markup context classification (HTML + Markdown)
//! - `linker/rewriter.rs` - LinkRewriter: plan-then-apply substitution pass
//! - `linker/markup.rs` - LinkMarkupBuilder: dialect link fragments + escaping
//! - `linker/engine.rs` - AutoLinker: **unified facade** - hydrate once, link per render
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { AutoLinker } from 'linkcore';
//!
//! await init();
//!
//! const linker = new AutoLinker();
//! linker.hydrateEntries([
//!   { id: 1, title: 'Recursion', url: '/a/recursion',
//!     aliases: [{ title: 'Recursive Function', url: '/a/recursive-function' }] },
//!   { id: 2, title: 'Python', url: '/cat/python' }
//! ]);
//!
//! // Rendered entry page; pass the entry's own id so it never self-links
//! const result = linker.linkHtml(html, 7);
//! console.log(result.output);  // linked HTML
//! console.log(result.stats);   // counters + per-phase timings
//! ```

pub mod linker;

pub use linker::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("linkcore v{}", env!("CARGO_PKG_VERSION"))
}
