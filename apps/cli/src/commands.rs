//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use kbexport_core::pipeline::{Pipeline, ProgressReporter};
use kbexport_shared::{ExportConfig, PipelineResult, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// kbexport — Zammad Knowledge Base to MkDocs exporter.
#[derive(Parser)]
#[command(
    name = "kbexport",
    version,
    about = "Export a Zammad knowledge base to a MkDocs documentation tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full export pipeline against a knowledge-base database.
    Export {
        /// SQLite database path (produced by the pgsql2sqlite import).
        db_path: PathBuf,

        /// Installation FQDN used to reconstruct content identifiers,
        /// e.g. zammad.example.org.
        #[arg(long)]
        fqdn: String,

        /// Output directory (defaults to the configured dist_dir).
        #[arg(short, long)]
        dist: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "kbexport=info",
        1 => "kbexport=debug",
        _ => "kbexport=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export {
            db_path,
            fqdn,
            dist,
        } => cmd_export(db_path, fqdn, dist).await,
        Command::Config { action } => cmd_config(action),
    }
}

async fn cmd_export(db_path: PathBuf, fqdn: String, dist: Option<PathBuf>) -> Result<()> {
    let app_config = load_config()?;
    let dist_dir = dist.unwrap_or_else(|| PathBuf::from(&app_config.defaults.dist_dir));

    let config = ExportConfig::new(db_path, fqdn, dist_dir);
    info!(
        db = %config.db_path.display(),
        dist = %config.dist_dir.display(),
        "exporting knowledge base"
    );

    let progress = SpinnerProgress::new();
    let result = Pipeline::new(config).run(&progress).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = init_config()?;
            println!("created {}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Spinner-based progress for interactive runs.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl ProgressReporter for SpinnerProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
        self.bar.tick();
    }

    fn document_rendered(&self, path: &str, current: usize, total: usize) {
        self.bar.set_message(format!("[{current}/{total}] {path}"));
        self.bar.tick();
    }

    fn done(&self, result: &PipelineResult) {
        self.bar.finish_with_message(format!(
            "{} documents rendered in {} ms",
            result.render.articles, result.elapsed_ms
        ));
    }
}
