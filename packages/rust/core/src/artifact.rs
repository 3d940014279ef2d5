//! Reading and writing the on-disk intermediate artifacts.
//!
//! Both artifacts are pretty-printed UTF-8 JSON so a run can be inspected
//! and each stage re-run independently.

use std::path::Path;

use tracing::debug;

use kbexport_shared::{KbExportError, Result};

/// Write a JSON artifact (pretty-printed).
pub(crate) fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| KbExportError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| KbExportError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON artifact");
    Ok(())
}

/// Read a JSON artifact back into its typed form.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| KbExportError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        KbExportError::validation(format!("invalid artifact {}: {e}", path.display()))
    })
}
