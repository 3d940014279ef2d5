//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = clean_blank_lines(&result);
    result = trim_trailing_spaces(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Collapse runs of 3+ blank lines into exactly 2.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").to_string()
}

/// Remove trailing spaces and tabs from every line.
fn trim_trailing_spaces(md: &str) -> String {
    static TRAILING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));

    TRAILING_RE.replace_all(md, "").to_string()
}

/// End the document with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let mut result = md.trim_end_matches(['\n', ' ', '\t']).to_string();
    result.push('\n');
    result
}
