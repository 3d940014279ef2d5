//! HTML-to-Markdown conversion and front-matter building.
//!
//! Converts rich-text article bodies to Markdown using the `htmd` crate,
//! then applies a small cleanup pass pipeline. Conversion is best-effort:
//! the caller is expected to fall back to the raw body on error rather
//! than fail a document.

mod cleanup;

use tracing::debug;

use kbexport_shared::{KbExportError, Result};

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert an HTML fragment (an article body) to clean Markdown.
///
/// 1. Pre-processes HTML tables into markdown tables
/// 2. Converts HTML → Markdown via `htmd`
/// 3. Runs the cleanup pipeline
pub fn convert_fragment(html: &str) -> Result<String> {
    let content_html = preprocess_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "iframe", "noscript"])
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| KbExportError::Conversion(format!("htmd conversion failed: {e}")))?;

    let cleaned = cleanup::run_pipeline(&raw_markdown);

    debug!(
        html_len = html.len(),
        markdown_len = cleaned.len(),
        "fragment converted"
    );

    Ok(cleaned)
}

// ---------------------------------------------------------------------------
// Front matter
// ---------------------------------------------------------------------------

/// Build a YAML front-matter block carrying a taxonomy tag list.
///
/// Emits flow style, e.g. `tags: [Setup, Administration]`, the form the
/// MkDocs Material tags plugin accepts. An empty tag set yields `tags: []`.
pub fn tags_front_matter(tags: &[String]) -> String {
    let rendered: Vec<String> = tags.iter().map(|t| yaml_scalar(t)).collect();
    format!("---\ntags: [{}]\n---\n", rendered.join(", "))
}

/// Render a YAML flow-sequence scalar, quoting only when required.
fn yaml_scalar(s: &str) -> String {
    let needs_quoting = s.is_empty()
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.chars()
            .any(|c| matches!(c, ',' | ':' | '#' | '[' | ']' | '{' | '}' | '"' | '\'' | '\n'));

    if needs_quoting {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert HTML `<table>` elements to markdown table syntax before htmd
/// conversion. `htmd` 0.1 doesn't support table conversion.
fn preprocess_tables(html: &str) -> String {
    let doc = scraper::Html::parse_fragment(html);

    let table_sel = scraper::Selector::parse("table").unwrap();

    if doc.select(&table_sel).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();

    for table_el in doc.select(&table_sel) {
        let table_html = table_el.html();
        let md_table = html_table_to_markdown(&table_el);
        result = result.replacen(&table_html, &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a markdown table string.
fn html_table_to_markdown(table: &scraper::ElementRef) -> String {
    let tr_sel = scraper::Selector::parse("tr").unwrap();
    let th_sel = scraper::Selector::parse("th").unwrap();
    let td_sel = scraper::Selector::parse("td").unwrap();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for tr in table.select(&tr_sel) {
        let ths: Vec<String> = tr
            .select(&th_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if !ths.is_empty() {
            has_header = true;
            rows.push(ths);
            continue;
        }

        let tds: Vec<String> = tr
            .select(&td_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if !tds.is_empty() {
            rows.push(tds);
        }
    }

    if rows.is_empty() {
        return String::new();
    }

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    // Normalize all rows to have the same number of columns
    for row in &mut rows {
        while row.len() < col_count {
            row.push(String::new());
        }
    }

    let mut md = String::from("\n\n");

    let header = &rows[0];
    md.push_str("| ");
    md.push_str(&header.join(" | "));
    md.push_str(" |\n");

    md.push_str("| ");
    md.push_str(
        &(0..col_count)
            .map(|_| "---")
            .collect::<Vec<_>>()
            .join(" | "),
    );
    md.push_str(" |\n");

    let data_start = if has_header { 1 } else { 0 };
    for row in &rows[data_start..] {
        md.push_str("| ");
        md.push_str(&row.join(" | "));
        md.push_str(" |\n");
    }

    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
