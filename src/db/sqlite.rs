use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};

use super::DatabaseError;

/// Ordered schema migrations. A version is applied at most once.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    include_str!("../../resources/migrations/001_initial.sql"),
)];

/// Autosave and export can touch the file back to back; wait rather than fail.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store file and bring its schema up to date.
/// Missing parent directories are created.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!(journal_mode = %mode, "Store journal mode");
    run_migrations(&mut conn)?;
    tracing::debug!(path = %path.display(), "Store opened");
    Ok(conn)
}

/// In-memory store with the full schema (tests, throwaway sessions).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let mut conn = Connection::open_in_memory()?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Apply every migration newer than the recorded version, each in its
/// own transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!(version, "Applying store migration");
        let failed = |e: rusqlite::Error| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        };
        let tx = conn.transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    Ok(())
}

/// Highest applied migration, 0 for a fresh file.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// User tables in the store (excludes SQLite internals).
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
