//! Application configuration for kbexport.
//!
//! User config lives at `~/.kbexport/kbexport.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KbExportError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "kbexport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".kbexport";

// ---------------------------------------------------------------------------
// Config structs (matching kbexport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for artifacts and rendered docs.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
        }
    }
}

fn default_dist_dir() -> String {
    "dist".into()
}

// ---------------------------------------------------------------------------
// Export config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime export configuration — merged from config file + CLI flags.
///
/// All output paths are derived from `dist_dir`:
///
/// ```text
/// <dist_dir>/
/// ├── kb.json            structured-unresolved artifact
/// ├── kb_resolved.json   image-resolved artifact
/// ├── images/            source images, named by blob-store id
/// └── docs/
///     ├── kb/            one .md file per (article, locale)
///     ├── tags.md        static tags index page
///     └── images/        copy of <dist_dir>/images/
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Path to the SQLite knowledge-base database.
    pub db_path: PathBuf,
    /// Installation FQDN used to reconstruct content identifiers,
    /// e.g. `zammad.example.org`.
    pub fqdn: String,
    /// Root output directory.
    pub dist_dir: PathBuf,
}

impl ExportConfig {
    pub fn new(db_path: impl Into<PathBuf>, fqdn: impl Into<String>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            fqdn: fqdn.into(),
            dist_dir: dist_dir.into(),
        }
    }

    /// MkDocs docs root.
    pub fn docs_dir(&self) -> PathBuf {
        self.dist_dir.join("docs")
    }

    /// Directory receiving one Markdown file per (article, locale).
    pub fn docs_kb_dir(&self) -> PathBuf {
        self.docs_dir().join("kb")
    }

    /// Source directory with image files named by blob-store id.
    pub fn images_dir(&self) -> PathBuf {
        self.dist_dir.join("images")
    }

    /// First intermediate artifact: structured but unresolved.
    pub fn structured_json_path(&self) -> PathBuf {
        self.dist_dir.join("kb.json")
    }

    /// Second intermediate artifact: content identifiers resolved.
    pub fn resolved_json_path(&self) -> PathBuf {
        self.dist_dir.join("kb_resolved.json")
    }

    /// Create the dist directory if it does not exist yet.
    pub fn ensure_dist_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dist_dir)
            .map_err(|e| KbExportError::io(&self.dist_dir, e))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.kbexport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| KbExportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.kbexport/kbexport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KbExportError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        KbExportError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| KbExportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| KbExportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| KbExportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("dist_dir"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.dist_dir, "dist");
    }

    #[test]
    fn config_overrides_dist_dir() {
        let toml_str = r#"
[defaults]
dist_dir = "/tmp/kb-out"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.dist_dir, "/tmp/kb-out");
    }

    #[test]
    fn export_config_derives_paths() {
        let config = ExportConfig::new("zammad.db", "zammad.example.org", "dist");
        assert_eq!(config.docs_kb_dir(), PathBuf::from("dist/docs/kb"));
        assert_eq!(config.images_dir(), PathBuf::from("dist/images"));
        assert_eq!(config.structured_json_path(), PathBuf::from("dist/kb.json"));
        assert_eq!(
            config.resolved_json_path(),
            PathBuf::from("dist/kb_resolved.json")
        );
    }
}
