//! Core pipeline for the knowledge-base export.
//!
//! This crate ties together relational structuring, content-identifier
//! resolution, and document rendering into the end-to-end export pipeline:
//!
//! 1. [`export`] — flatten the relational joins into a per-article,
//!    per-locale structure and persist it (`kb.json`)
//! 2. [`images`] — resolve embedded content identifiers against the blob
//!    store and persist the rewritten structure (`kb_resolved.json`)
//! 3. [`convert`] — render one Markdown document per (article, locale)
//!    into the MkDocs tree
//!
//! [`pipeline`] sequences the stages and aggregates their statistics.

mod artifact;
pub mod convert;
pub mod export;
pub mod images;
pub mod pipeline;
