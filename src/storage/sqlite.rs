//! SQLite storage implementation

use super::schema;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed data store for every workboard entity.
///
/// Owns a single connection with foreign keys enforced. Entity operations
/// live in sibling modules as further `impl Store` blocks.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        tracing::debug!("Opened store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Enable foreign keys and create the schema if missing
    fn initialize_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        self.conn.busy_timeout(std::time::Duration::from_secs(5))?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Whether SQLite is enforcing foreign keys on this connection
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: i64 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(enabled == 1)
    }

    /// Count rows in one table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        if !schema::TABLES.contains(&table) {
            return Err(Error::InvalidValue(format!("Unknown table: {}", table)));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::with_capacity(schema::TABLES.len());
        for table in schema::TABLES {
            tables.push((*table, self.count_rows(table)?));
        }
        Ok(DbStats { tables })
    }

    /// Connectivity check plus a schema sanity check
    pub fn health(&self) -> Result<HealthReport> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        let sqlite_version: String =
            self.conn
                .query_row("SELECT sqlite_version()", [], |row| row.get(0))?;

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let present: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        let missing_tables = schema::TABLES
            .iter()
            .filter(|t| !present.iter().any(|p| p == *t))
            .map(|t| t.to_string())
            .collect();

        Ok(HealthReport {
            connected: one == 1,
            foreign_keys: self.foreign_keys_enabled()?,
            sqlite_version,
            missing_tables,
        })
    }
}

/// Timestamp written to `created_at` / `updated_at`
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Read a `CHECK`-guarded enum column
pub(crate) fn enum_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a nullable `CHECK`-guarded enum column
pub(crate) fn optional_enum_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = Error>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Organization of a user, or `NotFound`
pub(crate) fn user_organization(conn: &Connection, user_id: i64) -> Result<i64> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT organization_id FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::not_found("User", user_id))
}

/// Reject a cross-tenant reference before it is written
pub(crate) fn ensure_user_in_org(
    conn: &Connection,
    entity: &'static str,
    user_id: i64,
    organization_id: i64,
) -> Result<()> {
    let found = user_organization(conn, user_id)?;
    if found != organization_id {
        return Err(Error::OrganizationMismatch {
            entity,
            expected: organization_id,
            found,
        });
    }
    Ok(())
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub tables: Vec<(&'static str, usize)>,
}

impl DbStats {
    pub fn get(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, count)| count).sum()
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, count) in &self.tables {
            writeln!(f, "  {}: {}", table, count)?;
        }
        write!(f, "  Total rows: {}", self.total_rows())
    }
}

/// Result of `Store::health`
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub connected: bool,
    pub foreign_keys: bool,
    pub sqlite_version: String,
    pub missing_tables: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.connected && self.foreign_keys && self.missing_tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.initialize_schema().unwrap();
        assert_eq!(store.stats().unwrap().total_rows(), 0);
    }

    #[test]
    fn test_health_on_fresh_store() {
        let store = Store::open_in_memory().unwrap();
        let report = store.health().unwrap();
        assert!(report.connected);
        assert!(report.foreign_keys);
        assert!(report.missing_tables.is_empty());
        assert!(report.is_healthy());
    }

    #[test]
    fn test_health_reports_missing_table() {
        let store = Store::open_in_memory().unwrap();
        store.conn.execute("DROP TABLE document_permissions", []).unwrap();
        let report = store.health().unwrap();
        assert_eq!(report.missing_tables, vec!["document_permissions".to_string()]);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.count_rows("sqlite_master"),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_file_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workboard.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .conn
                .execute("INSERT INTO organizations (name) VALUES ('Acme')", [])
                .unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.stats().unwrap().get("organizations"), Some(1));
    }
}
