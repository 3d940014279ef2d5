//! Pipeline orchestration: extract → resolve → render.
//!
//! The orchestrator only sequences the three stages and aggregates their
//! statistics. There is no retry and no rollback; a fault halts the
//! pipeline in its current stage, leaving already-persisted intermediate
//! artifacts on disk for diagnosis.

use std::time::Instant;

use tracing::{info, instrument};

use kbexport_shared::{ExportConfig, PipelineResult, Result};

use crate::{convert, export, images};

/// Pipeline progression. Each transition is one component invocation;
/// `Rendered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    Extracted,
    Resolved,
    Rendered,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a document is written during rendering.
    fn document_rendered(&self, path: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_rendered(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// The three-stage export pipeline.
pub struct Pipeline {
    config: ExportConfig,
    stage: Stage,
}

impl Pipeline {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            stage: Stage::NotStarted,
        }
    }

    /// The stage the pipeline last completed. After a fault this names the
    /// last stage whose artifact is trustworthy.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the full pipeline.
    #[instrument(skip_all, fields(db = %self.config.db_path.display()))]
    pub async fn run(&mut self, progress: &dyn ProgressReporter) -> Result<PipelineResult> {
        let start = Instant::now();

        info!(
            db = %self.config.db_path.display(),
            dist = %self.config.dist_dir.display(),
            "starting export pipeline"
        );
        self.config.ensure_dist_dir()?;

        progress.phase("Extracting knowledge base");
        let (_, structured_path) = export::run(&self.config).await?;
        self.stage = Stage::Extracted;

        progress.phase("Resolving content identifiers");
        let image_stats = images::run(&self.config).await?;
        self.stage = Stage::Resolved;

        progress.phase("Rendering documents");
        let render_stats = convert::run(&self.config, progress).await?;
        self.stage = Stage::Rendered;

        let result = PipelineResult {
            structured_path,
            resolved_path: self.config.resolved_json_path(),
            images: image_stats,
            render: render_stats,
            elapsed_ms: start.elapsed().as_millis(),
        };

        progress.done(&result);
        info!(
            articles = result.render.articles,
            references = result.images.references,
            unresolved = result.images.unresolved,
            elapsed_ms = result.elapsed_ms,
            "export pipeline complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbexport_shared::KbExportError;
    use std::path::PathBuf;

    /// Build a fixture Zammad database: one article (id 42) in category
    /// "Setup" with an English translation, plus the stores table.
    async fn fixture_db(dir: &PathBuf, with_image: bool) -> PathBuf {
        let path = dir.join("zammad.db");
        let db = libsql::Builder::new_local(&path).build().await.unwrap();
        let conn = db.connect().unwrap();

        conn.execute_batch(
            "CREATE TABLE knowledge_base_answers (id INTEGER PRIMARY KEY, category_id INTEGER);
             CREATE TABLE knowledge_base_answer_translations (
               id INTEGER PRIMARY KEY, answer_id INTEGER, kb_locale_id INTEGER,
               title TEXT, content_id INTEGER);
             CREATE TABLE knowledge_base_answer_translation_contents (id INTEGER PRIMARY KEY, body TEXT);
             CREATE TABLE knowledge_base_locales (id INTEGER PRIMARY KEY, system_locale_id INTEGER);
             CREATE TABLE knowledge_base_categories (id INTEGER PRIMARY KEY, parent_id INTEGER);
             CREATE TABLE knowledge_base_category_translations (
               id INTEGER PRIMARY KEY, category_id INTEGER, kb_locale_id INTEGER, title TEXT);
             CREATE TABLE stores (id INTEGER PRIMARY KEY, preferences TEXT);

             INSERT INTO knowledge_base_locales (id, system_locale_id) VALUES (10, 1);
             INSERT INTO knowledge_base_categories (id, parent_id) VALUES (3, NULL);
             INSERT INTO knowledge_base_category_translations (id, category_id, kb_locale_id, title)
               VALUES (1, 3, 10, 'Setup');
             INSERT INTO knowledge_base_answers (id, category_id) VALUES (42, 3);
             INSERT INTO knowledge_base_answer_translation_contents (id, body)
               VALUES (5, '<p>Hello</p>');
             INSERT INTO knowledge_base_answer_translations (id, answer_id, kb_locale_id, title, content_id)
               VALUES (7, 42, 10, 'Getting Started', 5);",
        )
        .await
        .unwrap();

        if with_image {
            conn.execute_batch(
                "UPDATE knowledge_base_answer_translation_contents
                   SET body = '<p><img src=\"cid:KnowledgeBase::Answer::Translation::Content_body.94d513bb-abee-4c8a-8132-0f2923118a95@zammad.example.org\"></p>'
                   WHERE id = 5;
                 INSERT INTO stores (id, preferences) VALUES
                   (26880, 'Content-ID: KnowledgeBase::Answer::Translation::Content_body.94d513bb-abee-4c8a-8132-0f2923118a95@zammad.example.org');",
            )
            .await
            .unwrap();
        }

        path
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kbexport_pipe_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn end_to_end_single_article() {
        let dir = temp_dir();
        let db = fixture_db(&dir, false).await;
        let dist = dir.join("dist");
        let config = ExportConfig::new(db, "zammad.example.org", &dist);

        let mut pipeline = Pipeline::new(config);
        assert_eq!(pipeline.stage(), Stage::NotStarted);

        let result = pipeline.run(&SilentProgress).await.expect("pipeline");
        assert_eq!(pipeline.stage(), Stage::Rendered);

        // Both intermediate artifacts persisted.
        assert!(dist.join("kb.json").exists());
        assert!(dist.join("kb_resolved.json").exists());

        // Exactly one output document with the expected layout.
        let doc = std::fs::read_to_string(dist.join("docs/kb/42.en.md")).expect("42.en.md");
        assert!(doc.starts_with("---\ntags: [Setup]\n---\n# Getting Started\n\n"));
        assert!(doc.contains("Hello"));

        assert_eq!(result.render.articles, 1);
        assert!(result.render.languages.contains("en"));
        assert!(result.render.tags.contains("Setup"));
        assert_eq!(result.images.references, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn end_to_end_with_resolvable_image() {
        let dir = temp_dir();
        let db = fixture_db(&dir, true).await;
        let dist = dir.join("dist");
        let config = ExportConfig::new(db, "zammad.example.org", &dist);

        let result = Pipeline::new(config)
            .run(&SilentProgress)
            .await
            .expect("pipeline");

        assert_eq!(result.images.references, 1);
        assert_eq!(result.images.resolved, 1);
        assert_eq!(result.images.unresolved, 0);

        // The resolved artifact points at image id 26880.
        let resolved = std::fs::read_to_string(dist.join("kb_resolved.json")).unwrap();
        assert!(resolved.contains("../images/26880"));
        assert!(!resolved.contains("cid:"));

        // The rendered document carries the rewritten reference.
        let doc = std::fs::read_to_string(dist.join("docs/kb/42.en.md")).unwrap();
        assert!(doc.contains("../images/26880"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn database_fault_halts_before_any_artifact() {
        let dir = temp_dir();
        let dist = dir.join("dist");
        let config = ExportConfig::new(dir.join("missing.db"), "zammad.example.org", &dist);

        let mut pipeline = Pipeline::new(config);
        let err = pipeline.run(&SilentProgress).await.unwrap_err();

        assert!(matches!(err, KbExportError::Database(_)));
        assert_eq!(pipeline.stage(), Stage::NotStarted);
        assert!(!dist.join("kb.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_locale_halts_in_not_started() {
        let dir = temp_dir();
        let db = fixture_db(&dir, false).await;

        // Add a translation in a locale outside the fixed table.
        let conn = libsql::Builder::new_local(&db)
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        conn.execute_batch(
            "INSERT INTO knowledge_base_locales (id, system_locale_id) VALUES (11, 99);
             INSERT INTO knowledge_base_answer_translations (id, answer_id, kb_locale_id, title, content_id)
               VALUES (8, 42, 11, 'Mystery', 5);",
        )
        .await
        .unwrap();

        let dist = dir.join("dist");
        let mut pipeline = Pipeline::new(ExportConfig::new(db, "zammad.example.org", &dist));
        let err = pipeline.run(&SilentProgress).await.unwrap_err();

        assert!(matches!(
            err,
            KbExportError::UnknownLocale { locale_id: 99, .. }
        ));
        assert_eq!(pipeline.stage(), Stage::NotStarted);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
