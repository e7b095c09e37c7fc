//! SQL DDL for all Reverie tables.
//!
//! Defines the `memories`, `associative_links`, and `schema_meta` tables. Vector and
//! list fields are stored as JSON text. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// All schema DDL statements for Reverie's tables.
const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    category TEXT NOT NULL CHECK(category IN ('preference','fact','instruction','context','goal','persona','skill','entity','episodic')),
    timestamp TEXT NOT NULL,
    importance INTEGER NOT NULL CHECK(importance BETWEEN 1 AND 5),
    source TEXT NOT NULL CHECK(source IN ('conversation','auto_extract')),
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed TEXT NOT NULL,
    embedding TEXT,
    relations TEXT NOT NULL DEFAULT '[]',
    consolidated INTEGER NOT NULL DEFAULT 0,
    decay REAL NOT NULL CHECK(decay >= 0.0 AND decay <= 1.0),
    activation_level REAL NOT NULL DEFAULT 0.0,
    emotional_valence REAL NOT NULL DEFAULT 0.0,
    context_signature TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);

-- Associative link graph
CREATE TABLE IF NOT EXISTS associative_links (
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    link_type TEXT NOT NULL CHECK(link_type IN ('causal','temporal','topical','semantic','contextual')),
    strength REAL NOT NULL CHECK(strength >= 0.0 AND strength <= 1.0),
    created_at TEXT NOT NULL,
    reinforcements INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (source_id, target_id, link_type),
    CHECK(source_id <> target_id)
);

CREATE INDEX IF NOT EXISTS idx_links_source ON associative_links(source_id);
CREATE INDEX IF NOT EXISTS idx_links_target ON associative_links(target_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // A new database starts at the current layout with the current vectors
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [super::meta::SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_scheme', ?1)",
        [crate::embedding::EMBEDDING_SCHEME],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"associative_links".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn self_links_are_rejected_by_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO associative_links (source_id, target_id, link_type, strength, created_at) \
             VALUES ('a', 'a', 'topical', 0.5, '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
