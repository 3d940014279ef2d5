//! kbexport CLI — export a Zammad knowledge base to a MkDocs project.
//!
//! Reads the SQLite knowledge-base export, resolves embedded image
//! references against the blob store, and renders one localized Markdown
//! document per (article, locale) pair.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
