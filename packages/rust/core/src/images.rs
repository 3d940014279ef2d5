//! Content-identifier resolver: rewrite embedded `cid:` references in
//! article bodies to on-disk image paths, and persist `kb_resolved.json`.
//!
//! Resolution is best-effort per reference. A miss leaves the reference
//! untouched and is reported through [`ResolveStats`]; missing images must
//! never abort the run. Rewriting is idempotent because a rewritten
//! reference no longer matches the unresolved syntax.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use kbexport_shared::{ExportConfig, ResolveStats, ResolvedExport, Result, StructuredExport};

/// Unresolved content-identifier syntax:
/// `cid:KnowledgeBase::Answer::Translation::Content_body.<uuid>@<fqdn>`.
static CID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"cid:KnowledgeBase::Answer::Translation::Content_body\.([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})@([A-Za-z0-9][A-Za-z0-9.-]*)",
    )
    .expect("valid regex")
});

/// One embedded content-identifier reference found in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidRef {
    /// The full `cid:…@…` token as it appears in the content.
    pub token: String,
    /// The UUID payload identifying the attachment.
    pub uuid: Uuid,
}

/// Scan a body for embedded content-identifier references, in order of
/// appearance. One entry per occurrence.
pub fn scan_content_ids(content: &str) -> Vec<CidRef> {
    CID_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let uuid = Uuid::parse_str(&caps[1]).ok()?;
            Some(CidRef {
                token: caps[0].to_string(),
                uuid,
            })
        })
        .collect()
}

/// Resolve every content identifier in the export against the blob store.
///
/// Each distinct reference is looked up once; a hit rewrites all of its
/// occurrences to `../images/{store_id}` (documents live in `docs/kb/`,
/// the image-materialization step populates `docs/images/` with files
/// named by blob-store id). A miss is counted and left as-is.
#[instrument(skip_all, fields(db = %config.db_path.display(), fqdn = %config.fqdn))]
pub async fn resolve_export(
    config: &ExportConfig,
    export: StructuredExport,
) -> Result<(ResolvedExport, ResolveStats)> {
    let mut stats = ResolveStats::default();
    // Lookup cache keyed by token; empty string marks a known miss.
    let mut lookups: HashMap<String, String> = HashMap::new();

    let mut articles = export.0;

    for (answer_id, entry) in articles.iter_mut() {
        for (locale_id, translation) in entry.translations.iter_mut() {
            let Some(content) = translation.content.as_ref() else {
                continue;
            };

            let refs = scan_content_ids(content);
            if refs.is_empty() {
                continue;
            }

            let mut rewritten = content.clone();
            for cid in &refs {
                stats.references += 1;

                if !lookups.contains_key(&cid.token) {
                    let image_id = kbexport_storage::content_id_to_image_id(
                        &cid.uuid.to_string(),
                        &config.db_path,
                        &config.fqdn,
                    )
                    .await?;
                    lookups.insert(cid.token.clone(), image_id);
                }

                let image_id = &lookups[&cid.token];
                if image_id.is_empty() {
                    stats.unresolved += 1;
                    warn!(
                        answer_id = %answer_id,
                        locale_id = %locale_id,
                        cid = %cid.uuid,
                        "content identifier not found in blob store, leaving unresolved"
                    );
                } else {
                    stats.resolved += 1;
                    rewritten = rewritten.replacen(&cid.token, &format!("../images/{image_id}"), 1);
                    debug!(
                        answer_id = %answer_id,
                        cid = %cid.uuid,
                        image_id = %image_id,
                        "content identifier rewritten"
                    );
                }
            }

            translation.content = Some(rewritten);
        }
    }

    Ok((ResolvedExport(articles), stats))
}

/// Read `kb.json`, resolve, persist `kb_resolved.json`, and report stats.
#[instrument(skip_all)]
pub async fn run(config: &ExportConfig) -> Result<ResolveStats> {
    let export: StructuredExport = crate::artifact::read_json(&config.structured_json_path())?;

    let (resolved, stats) = resolve_export(config, export).await?;

    let path = config.resolved_json_path();
    crate::artifact::write_json(&path, &resolved)?;

    info!(
        references = stats.references,
        resolved = stats.resolved,
        unresolved = stats.unresolved,
        path = %path.display(),
        "image resolution complete"
    );

    Ok(stats)
}
