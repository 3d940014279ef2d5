//! Read-only libSQL access to the Zammad knowledge-base database.
//!
//! Two operations live here:
//! - [`execute_query`] — run a read-only statement and return the rows as
//!   ordered, column-name-addressable mappings.
//! - [`content_id_to_image_id`] — the point lookup that turns an embedded
//!   content identifier into a blob-store id.
//!
//! Every call opens a fresh connection and drops it at scope end; nothing
//! is shared across pipeline stages. The database file is a precondition
//! (produced by the pgsql import) and is never created here.
//!
//! The content-identifier lookup is a deliberate substring scan against the
//! `stores.preferences` blob; keep callers behind this interface so the
//! matching strategy can be swapped without touching them.

use std::path::Path;

use libsql::{Connection, Value, params};
use tracing::{debug, instrument};

use kbexport_shared::{KbExportError, Result};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One result row, addressable by column name. Column order matches the
/// statement's select list.
#[derive(Debug, Clone)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl SqlRow {
    /// Build a row from parallel column/value lists. Used by the accessor
    /// and by tests that exercise the fold without a database.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Raw value for a column, or `None` if the column is not present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Integer value for a column; `None` for NULL, missing, or non-integer.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column) {
            Some(Value::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Text value for a column; `None` for NULL, missing, or non-text.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Open a connection to an existing database file.
///
/// Refuses to open a path that does not exist: libSQL would silently
/// create an empty database there, and every query against it would then
/// fail with a confusing "no such table" instead of "no such file".
async fn connect(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(KbExportError::Database(format!(
            "database file not found: {}",
            db_path.display()
        )));
    }

    let db = libsql::Builder::new_local(db_path)
        .build()
        .await
        .map_err(|e| KbExportError::Database(e.to_string()))?;

    db.connect()
        .map_err(|e| KbExportError::Database(e.to_string()))
}

// ---------------------------------------------------------------------------
// Query execution
// ---------------------------------------------------------------------------

/// Execute a read-only SQL statement and return all rows in statement order.
#[instrument(skip(sql), fields(db = %db_path.display()))]
pub async fn execute_query(db_path: &Path, sql: &str) -> Result<Vec<SqlRow>> {
    let conn = connect(db_path).await?;

    let mut rows = conn
        .query(sql, params![])
        .await
        .map_err(|e| KbExportError::Database(e.to_string()))?;

    let column_count = rows.column_count();
    let columns: Vec<String> = (0..column_count)
        .map(|i| rows.column_name(i).unwrap_or_default().to_string())
        .collect();

    let mut result = Vec::new();
    loop {
        match rows.next().await {
            Ok(Some(row)) => {
                let mut values = Vec::with_capacity(columns.len());
                for i in 0..column_count {
                    let value = row
                        .get_value(i)
                        .map_err(|e| KbExportError::Database(e.to_string()))?;
                    values.push(value);
                }
                result.push(SqlRow::new(columns.clone(), values));
            }
            Ok(None) => break,
            Err(e) => return Err(KbExportError::Database(e.to_string())),
        }
    }

    debug!(rows = result.len(), "query complete");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Content-identifier point lookup
// ---------------------------------------------------------------------------

/// Resolve the UUID portion of a content identifier to a blob-store id.
///
/// Reconstructs the full content identifier for this installation,
/// `KnowledgeBase::Answer::Translation::Content_body.{uuid}@{fqdn}`, and
/// scans `stores.preferences` for a record embedding it as
/// `Content-ID: <full cid>`. There is no foreign key between article
/// bodies and the stores table; substring containment is the only linkage.
///
/// Returns the first matching record's id under the store's default
/// ordering, or an empty string when nothing matches.
#[instrument(skip(db_path), fields(db = %db_path.display()))]
pub async fn content_id_to_image_id(cid: &str, db_path: &Path, fqdn: &str) -> Result<String> {
    let conn = connect(db_path).await?;

    let full_cid = format!("KnowledgeBase::Answer::Translation::Content_body.{cid}@{fqdn}");
    let pattern = format!("%Content-ID: {full_cid}%");

    let mut rows = conn
        .query(
            "SELECT id FROM stores WHERE preferences LIKE ?1",
            params![pattern.as_str()],
        )
        .await
        .map_err(|e| KbExportError::Database(e.to_string()))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let id: i64 = row
                .get(0)
                .map_err(|e| KbExportError::Database(e.to_string()))?;
            debug!(%cid, image_id = id, "content identifier resolved");
            Ok(id.to_string())
        }
        Ok(None) => {
            debug!(%cid, "content identifier not found in stores");
            Ok(String::new())
        }
        Err(e) => Err(KbExportError::Database(e.to_string())),
    }
}
