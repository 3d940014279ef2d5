//! Core domain types for the knowledge-base export.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Locale table
// ---------------------------------------------------------------------------

/// Fixed, closed mapping of Zammad system locale ids to locale codes.
///
/// Exhaustive for supported installations. An unlisted id is a
/// data-integrity fault, not a silently-skipped row.
pub const LOCALES: &[(i64, &str)] = &[(1, "en"), (35, "de")];

/// Look up the locale code for a system locale id.
pub fn locale_code(locale_id: i64) -> Option<&'static str> {
    LOCALES
        .iter()
        .find(|(id, _)| *id == locale_id)
        .map(|(_, code)| *code)
}

// ---------------------------------------------------------------------------
// Article structure
// ---------------------------------------------------------------------------

/// Category snapshot attached to an article.
///
/// Parent data is denormalized one level up only; grandparent titles are
/// never resolved. A category with no parent id has no parent title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub parent_id: Option<i64>,
    pub parent_title: Option<String>,
}

impl Category {
    /// The taxonomy tags derived from this category: its own title and the
    /// parent title, absent values omitted.
    pub fn tags(&self) -> Vec<String> {
        [&self.title, &self.parent_title]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

/// The title/body pair for one article in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub title: String,
    /// Rich-text HTML body; may be absent or empty.
    pub content: Option<String>,
}

/// One article folded out of the flat join: a category snapshot plus its
/// translations keyed by locale id (string, as serialized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleEntry {
    pub category: Category,
    pub translations: BTreeMap<String, Translation>,
}

// ---------------------------------------------------------------------------
// Intermediate artifacts
// ---------------------------------------------------------------------------

/// First intermediate artifact (`kb.json`): structured but with embedded
/// content identifiers still unresolved. Keyed by answer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredExport(pub BTreeMap<String, ArticleEntry>);

/// Second intermediate artifact (`kb_resolved.json`): same shape, with
/// content identifiers rewritten to image paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedExport(pub BTreeMap<String, ArticleEntry>);

// ---------------------------------------------------------------------------
// Per-stage statistics
// ---------------------------------------------------------------------------

/// Statistics from the content-identifier resolution stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Content-identifier references seen across all translations.
    pub references: usize,
    /// References rewritten to an image path.
    pub resolved: usize,
    /// References left unresolved (no matching blob-store record).
    pub unresolved: usize,
}

/// Statistics from the document rendering stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Markdown documents written.
    pub articles: usize,
    /// Distinct locale codes encountered.
    pub languages: BTreeSet<String>,
    /// Distinct taxonomy tags encountered.
    pub tags: BTreeSet<String>,
}

/// Aggregate result of one full pipeline run. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Path of the structured-unresolved artifact.
    pub structured_path: PathBuf,
    /// Path of the image-resolved artifact.
    pub resolved_path: PathBuf,
    pub images: ResolveStats,
    pub render: RenderStats,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u128,
}
