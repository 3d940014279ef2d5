//! Relational structurer: flatten the knowledge-base joins into the
//! per-article, per-locale structure and persist it as `kb.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, instrument};

use kbexport_shared::{
    ArticleEntry, Category, ExportConfig, KbExportError, Result, StructuredExport, Translation,
    locale_code,
};
use kbexport_storage::SqlRow;

/// The fixed multi-way join across answers, translations, bodies, locales,
/// categories, and category translations (with a single parent self-join
/// for the denormalized parent title). Ordered by answer id, then
/// translation id.
pub const KNOWLEDGE_BASE_QUERY: &str = "
    SELECT
        knowledge_base_answers.id AS answer_id,
        knowledge_base_answer_translations.id AS translation_id,
        knowledge_base_answer_translations.title AS answer_title,
        knowledge_base_answer_translation_contents.body AS answer_content,
        knowledge_base_locales.system_locale_id AS locale,
        kcat.title AS category_title,
        knowledge_base_categories.parent_id AS parent_id,
        parent_cat_trans.title AS parent_title,
        kcat.category_id AS category_id
    FROM
        knowledge_base_answers
        LEFT JOIN knowledge_base_answer_translations
            ON knowledge_base_answers.id = knowledge_base_answer_translations.answer_id
        LEFT JOIN knowledge_base_answer_translation_contents
            ON knowledge_base_answer_translations.content_id = knowledge_base_answer_translation_contents.id
        LEFT JOIN knowledge_base_locales
            ON knowledge_base_answer_translations.kb_locale_id = knowledge_base_locales.id
        LEFT JOIN knowledge_base_categories
            ON knowledge_base_answers.category_id = knowledge_base_categories.id
        LEFT JOIN knowledge_base_category_translations kcat
            ON knowledge_base_categories.id = kcat.category_id
            AND kcat.kb_locale_id = knowledge_base_locales.id
        LEFT JOIN knowledge_base_categories parent_cat
            ON knowledge_base_categories.parent_id = parent_cat.id
        LEFT JOIN knowledge_base_category_translations parent_cat_trans
            ON parent_cat.id = parent_cat_trans.category_id
            AND parent_cat_trans.kb_locale_id = knowledge_base_locales.id
    ORDER BY
        knowledge_base_answers.id,
        knowledge_base_answer_translations.id
";

/// Fold the flat join rows into the nested per-article structure.
///
/// The first row seen for an answer id establishes its category snapshot;
/// later rows that disagree are not checked and do not overwrite it. Every
/// row contributes one translation keyed by locale id.
pub fn structure_rows(rows: &[SqlRow]) -> Result<StructuredExport> {
    let mut articles: BTreeMap<String, ArticleEntry> = BTreeMap::new();

    for row in rows {
        let answer_id = row.get_i64("answer_id").ok_or_else(|| {
            KbExportError::Database("join returned a row without an answer id".into())
        })?;

        let locale_id = row.get_i64("locale").ok_or_else(|| {
            KbExportError::Database(format!("answer {answer_id} has a row without a locale id"))
        })?;

        // The locale table is closed; an unlisted id is a data-integrity
        // fault, not a skippable row.
        if locale_code(locale_id).is_none() {
            return Err(KbExportError::UnknownLocale {
                answer_id,
                locale_id,
            });
        }

        let entry = articles
            .entry(answer_id.to_string())
            .or_insert_with(|| ArticleEntry {
                category: Category {
                    id: row.get_i64("category_id"),
                    title: row.get_str("category_title").map(String::from),
                    parent_id: row.get_i64("parent_id"),
                    parent_title: row.get_str("parent_title").map(String::from),
                },
                translations: BTreeMap::new(),
            });

        entry.translations.insert(
            locale_id.to_string(),
            Translation {
                title: row.get_str("answer_title").unwrap_or_default().to_string(),
                content: row.get_str("answer_content").map(String::from),
            },
        );
    }

    Ok(StructuredExport(articles))
}

/// Query the database, fold the rows, and persist the first intermediate
/// artifact. Returns the structure and the artifact path.
#[instrument(skip_all, fields(db = %config.db_path.display()))]
pub async fn run(config: &ExportConfig) -> Result<(StructuredExport, PathBuf)> {
    let rows = kbexport_storage::execute_query(&config.db_path, KNOWLEDGE_BASE_QUERY).await?;
    let export = structure_rows(&rows)?;

    let path = config.structured_json_path();
    crate::artifact::write_json(&path, &export)?;

    info!(
        articles = export.0.len(),
        path = %path.display(),
        "structured export persisted"
    );

    Ok((export, path))
}
