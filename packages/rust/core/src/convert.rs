//! Document renderer: one Markdown file per (article, locale) pair,
//! plus the static tags index page and the images directory copy.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use kbexport_shared::{
    ExportConfig, KbExportError, RenderStats, ResolvedExport, Result, locale_code,
};

use crate::pipeline::ProgressReporter;

/// Fixed content of the MkDocs tags index page.
const TAGS_PAGE: &str = "# Tags\n\n<!-- material/tags -->\n";

/// Render the resolved export into the MkDocs docs tree.
///
/// The destination article directory is removed and recreated before any
/// file is written; a prior partial run leaves no residue. For each
/// (article, locale) pair exactly one file `{answer_id}.{locale}.md` is
/// written, consisting of a `tags` front-matter block, a level-one heading
/// from the translation title, and the rendered body. A body that fails
/// HTML-to-Markdown conversion is emitted raw; rendering never aborts the
/// pipeline.
#[instrument(skip_all, fields(out = %config.docs_kb_dir().display()))]
pub async fn run(config: &ExportConfig, progress: &dyn ProgressReporter) -> Result<RenderStats> {
    let export: ResolvedExport = crate::artifact::read_json(&config.resolved_json_path())?;

    let kb_dir = config.docs_kb_dir();
    if kb_dir.exists() {
        std::fs::remove_dir_all(&kb_dir).map_err(|e| KbExportError::io(&kb_dir, e))?;
    }
    std::fs::create_dir_all(&kb_dir).map_err(|e| KbExportError::io(&kb_dir, e))?;

    let total: usize = export.0.values().map(|e| e.translations.len()).sum();
    let mut stats = RenderStats::default();

    for (answer_id, entry) in &export.0 {
        let tags = entry.category.tags();

        for (locale_key, translation) in &entry.translations {
            let answer_id_num: i64 = answer_id.parse().map_err(|_| {
                KbExportError::validation(format!("artifact key {answer_id:?} is not an answer id"))
            })?;
            let locale_id: i64 = locale_key.parse().map_err(|_| {
                KbExportError::validation(format!("artifact key {locale_key:?} is not a locale id"))
            })?;
            let locale = locale_code(locale_id).ok_or(KbExportError::UnknownLocale {
                answer_id: answer_id_num,
                locale_id,
            })?;

            let document = render_document(&translation.title, translation.content.as_deref(), &tags);

            let file_path = kb_dir.join(format!("{answer_id}.{locale}.md"));
            std::fs::write(&file_path, &document)
                .map_err(|e| KbExportError::io(&file_path, e))?;
            debug!(path = %file_path.display(), "created");

            stats.articles += 1;
            stats.languages.insert(locale.to_string());
            stats.tags.extend(tags.iter().cloned());

            progress.document_rendered(&file_path.display().to_string(), stats.articles, total);
        }
    }

    write_tags_page(&config.docs_dir())?;
    copy_images(&config.images_dir(), &config.docs_dir())?;

    info!(
        articles = stats.articles,
        languages = ?stats.languages,
        "render complete"
    );

    Ok(stats)
}

/// Assemble one document: front matter, heading, rendered body.
fn render_document(title: &str, content: Option<&str>, tags: &[String]) -> String {
    let body = match content {
        Some(html) if !html.is_empty() => match kbexport_markdown::convert_fragment(html) {
            Ok(md) => md,
            Err(e) => {
                // Best-effort contract: fall back to the raw markup.
                warn!(%title, error = %e, "conversion failed, emitting raw content");
                html.to_string()
            }
        },
        _ => String::new(),
    };

    format!(
        "{front}# {title}\n\n{body}",
        front = kbexport_markdown::tags_front_matter(tags),
    )
}

/// Write the fixed tags index page once per run.
fn write_tags_page(docs_dir: &Path) -> Result<()> {
    let path = docs_dir.join("tags.md");
    std::fs::write(&path, TAGS_PAGE).map_err(|e| KbExportError::io(&path, e))?;
    info!(path = %path.display(), "created tags page");
    Ok(())
}

/// Copy the source images directory wholesale into the docs tree.
///
/// A missing source directory is a warning, not a fault; the copy step is
/// skipped and the run continues.
fn copy_images(images_dir: &Path, docs_dir: &Path) -> Result<()> {
    if !images_dir.exists() {
        warn!(path = %images_dir.display(), "images directory not found, skipping copy");
        return Ok(());
    }

    let target = docs_dir.join("images");
    info!(
        from = %images_dir.display(),
        to = %target.display(),
        "copying images"
    );
    copy_dir_recursive(images_dir, &target)
}

/// Recursively copy a directory tree, merging into an existing target.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).map_err(|e| KbExportError::io(dst, e))?;

    let entries = std::fs::read_dir(src).map_err(|e| KbExportError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| KbExportError::io(src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let file_type = entry.file_type().map_err(|e| KbExportError::io(&src_path, e))?;
        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).map_err(|e| KbExportError::io(&src_path, e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use kbexport_shared::{ArticleEntry, Category, Translation};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn temp_dist() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kbexport_render_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(dist: &Path) -> ExportConfig {
        ExportConfig::new("unused.db", "zammad.example.org", dist)
    }

    fn entry(
        category: Option<(&str, Option<&str>)>,
        translations: &[(&str, &str, Option<&str>)],
    ) -> ArticleEntry {
        ArticleEntry {
            category: match category {
                Some((title, parent)) => Category {
                    id: Some(3),
                    title: Some(title.to_string()),
                    parent_id: parent.map(|_| 2),
                    parent_title: parent.map(String::from),
                },
                None => Category {
                    id: None,
                    title: None,
                    parent_id: None,
                    parent_title: None,
                },
            },
            translations: translations
                .iter()
                .map(|(locale, title, content)| {
                    (
                        locale.to_string(),
                        Translation {
                            title: title.to_string(),
                            content: content.map(String::from),
                        },
                    )
                })
                .collect(),
        }
    }

    fn write_resolved(dist: &Path, articles: BTreeMap<String, ArticleEntry>) {
        crate::artifact::write_json(&dist.join("kb_resolved.json"), &ResolvedExport(articles))
            .unwrap();
    }

    #[tokio::test]
    async fn renders_one_file_per_article_locale_pair() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert(
            "42".to_string(),
            entry(
                Some(("Setup", None)),
                &[
                    ("1", "Getting Started", Some("<p>Hello</p>")),
                    ("35", "Erste Schritte", Some("<p>Hallo</p>")),
                ],
            ),
        );
        write_resolved(&dist, articles);

        let stats = run(&config(&dist), &SilentProgress).await.expect("render");

        let kb_dir = dist.join("docs/kb");
        assert!(kb_dir.join("42.en.md").exists());
        assert!(kb_dir.join("42.de.md").exists());

        // Exactly one file per pair, nothing else for this article.
        let files: Vec<_> = std::fs::read_dir(&kb_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 2);

        assert_eq!(stats.articles, 2);
        assert_eq!(
            stats.languages.iter().cloned().collect::<Vec<_>>(),
            vec!["de", "en"]
        );
        assert_eq!(stats.tags.iter().cloned().collect::<Vec<_>>(), vec!["Setup"]);

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn document_layout_matches_contract() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert(
            "42".to_string(),
            entry(
                Some(("Setup", None)),
                &[("1", "Getting Started", Some("<p>Hello</p>"))],
            ),
        );
        write_resolved(&dist, articles);

        run(&config(&dist), &SilentProgress).await.expect("render");

        let doc = std::fs::read_to_string(dist.join("docs/kb/42.en.md")).unwrap();
        assert!(doc.starts_with("---\ntags: [Setup]\n---\n# Getting Started\n\n"));
        assert!(doc.contains("Hello"));
        assert!(!doc.contains("<p>"));

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn null_category_yields_empty_tag_list() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert(
            "8".to_string(),
            entry(None, &[("1", "Uncategorized", Some("<p>x</p>"))]),
        );
        write_resolved(&dist, articles);

        let stats = run(&config(&dist), &SilentProgress).await.expect("render");

        let doc = std::fs::read_to_string(dist.join("docs/kb/8.en.md")).unwrap();
        assert!(doc.starts_with("---\ntags: []\n---\n"));
        assert!(stats.tags.is_empty());

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn parent_title_joins_the_tag_set() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert(
            "5".to_string(),
            entry(
                Some(("Printers", Some("Hardware"))),
                &[("1", "Toner", Some("<p>x</p>"))],
            ),
        );
        write_resolved(&dist, articles);

        run(&config(&dist), &SilentProgress).await.expect("render");

        let doc = std::fs::read_to_string(dist.join("docs/kb/5.en.md")).unwrap();
        assert!(doc.starts_with("---\ntags: [Printers, Hardware]\n---\n"));

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn empty_content_renders_heading_only() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert("9".to_string(), entry(None, &[("1", "Stub", None)]));
        write_resolved(&dist, articles);

        run(&config(&dist), &SilentProgress).await.expect("render");

        let doc = std::fs::read_to_string(dist.join("docs/kb/9.en.md")).unwrap();
        assert_eq!(doc, "---\ntags: []\n---\n# Stub\n\n");

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn destination_is_recreated_destructively() {
        let dist = temp_dist();
        let kb_dir = dist.join("docs/kb");
        std::fs::create_dir_all(&kb_dir).unwrap();
        std::fs::write(kb_dir.join("stale.en.md"), "old run").unwrap();

        let mut articles = BTreeMap::new();
        articles.insert("1".to_string(), entry(None, &[("1", "Fresh", None)]));
        write_resolved(&dist, articles);

        run(&config(&dist), &SilentProgress).await.expect("render");

        assert!(!kb_dir.join("stale.en.md").exists());
        assert!(kb_dir.join("1.en.md").exists());

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn tags_page_is_written_once() {
        let dist = temp_dist();
        write_resolved(&dist, BTreeMap::new());

        run(&config(&dist), &SilentProgress).await.expect("render");

        let tags = std::fs::read_to_string(dist.join("docs/tags.md")).unwrap();
        assert_eq!(tags, TAGS_PAGE);

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn missing_images_directory_is_not_a_fault() {
        let dist = temp_dist();
        write_resolved(&dist, BTreeMap::new());

        // No dist/images present: render succeeds, no docs/images created.
        run(&config(&dist), &SilentProgress).await.expect("render");
        assert!(!dist.join("docs/images").exists());

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn images_directory_is_copied_wholesale() {
        let dist = temp_dist();
        write_resolved(&dist, BTreeMap::new());

        let images = dist.join("images");
        std::fs::create_dir_all(images.join("nested")).unwrap();
        std::fs::write(images.join("26880"), b"png bytes").unwrap();
        std::fs::write(images.join("nested/26881"), b"more bytes").unwrap();

        run(&config(&dist), &SilentProgress).await.expect("render");

        assert_eq!(
            std::fs::read(dist.join("docs/images/26880")).unwrap(),
            b"png bytes"
        );
        assert_eq!(
            std::fs::read(dist.join("docs/images/nested/26881")).unwrap(),
            b"more bytes"
        );

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[tokio::test]
    async fn unknown_locale_key_in_artifact_is_fatal() {
        let dist = temp_dist();
        let mut articles = BTreeMap::new();
        articles.insert("3".to_string(), entry(None, &[("99", "X", None)]));
        write_resolved(&dist, articles);

        let err = run(&config(&dist), &SilentProgress).await.unwrap_err();
        assert!(matches!(err, KbExportError::UnknownLocale { .. }));

        let _ = std::fs::remove_dir_all(&dist);
    }

    #[test]
    fn round_trip_body_is_independent_of_resolution() {
        // A CID-free body renders to heading + converted content only.
        let doc = render_document("Title", Some("<p>Hello <strong>world</strong></p>"), &[]);
        let body = doc
            .strip_prefix("---\ntags: []\n---\n# Title\n\n")
            .expect("layout prefix");
        assert_eq!(
            body,
            kbexport_markdown::convert_fragment("<p>Hello <strong>world</strong></p>").unwrap()
        );
    }
}
