//! Shared types, error model, and configuration for kbexport.
//!
//! This crate is the foundation depended on by all other kbexport crates.
//! It provides:
//! - [`KbExportError`] — the unified error type
//! - Domain types ([`ArticleEntry`], [`Category`], [`Translation`], the
//!   intermediate artifact documents)
//! - Configuration ([`AppConfig`], [`ExportConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExportConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{KbExportError, Result};
pub use types::{
    ArticleEntry, Category, LOCALES, PipelineResult, RenderStats, ResolveStats, ResolvedExport,
    StructuredExport, Translation, locale_code,
};
