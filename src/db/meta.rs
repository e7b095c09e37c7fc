//! Database metadata kept in `schema_meta`.
//!
//! Two keys matter: `schema_version`, which a binary refuses to open when it is
//! newer than [`SCHEMA_VERSION`], and `embedding_scheme`, the hashing scheme the
//! stored vectors were computed with. Vectors from any other scheme are cleared
//! on open so they get recomputed from content.

use rusqlite::{Connection, OptionalExtension};

use crate::embedding::EMBEDDING_SCHEME;

/// Layout version written by [`crate::db::schema::init_schema`].
pub const SCHEMA_VERSION: u32 = 1;

/// What [`reconcile_embedding_scheme`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeStatus {
    Current,
    /// Vectors from the named scheme were cleared.
    Replaced { previous: String, cleared: usize },
}

fn read_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

/// Stored layout version. An unreadable value counts as 0.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(read_key(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

pub fn embedding_scheme(conn: &Connection) -> rusqlite::Result<Option<String>> {
    read_key(conn, "embedding_scheme")
}

pub fn set_embedding_scheme(conn: &Connection, scheme: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_scheme', ?1)",
        [scheme],
    )?;
    Ok(())
}

/// Clear stored vectors computed with a scheme other than [`EMBEDDING_SCHEME`]
/// and record the current one. Both happen in one transaction.
pub fn reconcile_embedding_scheme(conn: &Connection) -> rusqlite::Result<SchemeStatus> {
    let stored = embedding_scheme(conn)?;
    let previous = match stored {
        Some(s) if s == EMBEDDING_SCHEME => return Ok(SchemeStatus::Current),
        Some(s) => s,
        None => String::from("unknown"),
    };

    let tx = conn.unchecked_transaction()?;
    let cleared = tx.execute(
        "UPDATE memories SET embedding = NULL WHERE embedding IS NOT NULL",
        [],
    )?;
    set_embedding_scheme(&tx, EMBEDDING_SCHEME)?;
    tx.commit()?;

    tracing::warn!(
        previous = %previous,
        current = EMBEDDING_SCHEME,
        cleared,
        "embedding scheme changed; stored vectors will be recomputed"
    );
    Ok(SchemeStatus::Replaced { previous, cleared })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    fn insert_with_vector(conn: &Connection, id: &str) {
        conn.execute(
            "INSERT INTO memories (id, content, category, timestamp, importance, source, \
             last_accessed, embedding, decay) \
             VALUES (?1, 'User plays the cello', 'skill', '2026-01-01T00:00:00Z', 3, \
             'conversation', '2026-01-01T00:00:00Z', '[1.0,1.0]', 1.0)",
            [id],
        )
        .unwrap();
    }

    fn stored_vectors(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_database_records_current_scheme() {
        let conn = fresh();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(embedding_scheme(&conn).unwrap().as_deref(), Some(EMBEDDING_SCHEME));
        assert_eq!(reconcile_embedding_scheme(&conn).unwrap(), SchemeStatus::Current);
    }

    #[test]
    fn matching_scheme_keeps_vectors() {
        let conn = fresh();
        insert_with_vector(&conn, "a");
        reconcile_embedding_scheme(&conn).unwrap();
        assert_eq!(stored_vectors(&conn), 1);
    }

    #[test]
    fn foreign_scheme_clears_vectors_once() {
        let conn = fresh();
        insert_with_vector(&conn, "a");
        insert_with_vector(&conn, "b");
        set_embedding_scheme(&conn, "minilm-384").unwrap();

        let status = reconcile_embedding_scheme(&conn).unwrap();
        assert_eq!(
            status,
            SchemeStatus::Replaced {
                previous: "minilm-384".into(),
                cleared: 2
            }
        );
        assert_eq!(stored_vectors(&conn), 0);
        assert_eq!(embedding_scheme(&conn).unwrap().as_deref(), Some(EMBEDDING_SCHEME));
        assert_eq!(reconcile_embedding_scheme(&conn).unwrap(), SchemeStatus::Current);
    }

    #[test]
    fn missing_scheme_is_treated_as_foreign() {
        let conn = fresh();
        conn.execute("DELETE FROM schema_meta WHERE key = 'embedding_scheme'", [])
            .unwrap();
        insert_with_vector(&conn, "a");
        let status = reconcile_embedding_scheme(&conn).unwrap();
        assert!(matches!(status, SchemeStatus::Replaced { cleared: 1, .. }));
    }
}
