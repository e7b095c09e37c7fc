//! SQLite storage backing the [`crate::memory::repository::SqliteRepository`].

pub mod meta;
pub mod schema;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the Reverie database at the given path with schema initialized
/// and stale vectors cleared.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL lets retrieval reads proceed while a turn's reinforcement is written
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    prepare(&conn)?;
    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a prepared in-memory database.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    schema::init_schema(conn).context("failed to initialize schema")?;
    let version = meta::schema_version(conn).context("failed to read schema version")?;
    if version > meta::SCHEMA_VERSION {
        bail!(
            "database schema version {version} is newer than supported version {}",
            meta::SCHEMA_VERSION
        );
    }
    meta::reconcile_embedding_scheme(conn).context("failed to reconcile embedding scheme")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_database_is_prepared() {
        let conn = open_memory_database().unwrap();
        assert_eq!(meta::schema_version(&conn).unwrap(), meta::SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.db");
        {
            let conn = open_database(&path).unwrap();
            conn.execute(
                "UPDATE schema_meta SET value = '99' WHERE key = 'schema_version'",
                [],
            )
            .unwrap();
        }
        let err = open_database(&path).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }
}
