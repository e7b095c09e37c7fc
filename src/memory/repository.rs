//! Persistence boundary for memory and link collections.
//!
//! The core works on in-memory `Vec`s; a [`MemoryRepository`] loads and saves them.
//! Saves are upserts keyed by memory id and by `(source, target, type)` for links,
//! so saving part of a collection never deletes the rest.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::embedding::EMBEDDING_DIM;
use crate::error::{CoreError, CoreResult};
use crate::memory::types::{AssociativeLink, MemoryEntry};

/// Load/save of memory and link collections.
pub trait MemoryRepository {
    fn load_memories(&self) -> CoreResult<Vec<MemoryEntry>>;
    fn save_memories(&mut self, entries: &[MemoryEntry]) -> CoreResult<()>;
    fn load_links(&self) -> CoreResult<Vec<AssociativeLink>>;
    fn save_links(&mut self, links: &[AssociativeLink]) -> CoreResult<()>;
}

/// [`MemoryRepository`] over a SQLite connection.
///
/// Expects a connection prepared by [`crate::db::open_database`], which clears
/// vectors left by another embedding scheme.
pub struct SqliteRepository {
    conn: Connection,
}

struct MemoryRow {
    id: String,
    content: String,
    keywords: String,
    category: String,
    timestamp: String,
    importance: u8,
    source: String,
    access_count: u32,
    last_accessed: String,
    embedding: Option<String>,
    relations: String,
    consolidated: bool,
    decay: f64,
    activation_level: f64,
    emotional_valence: f64,
    context_signature: String,
}

struct LinkRow {
    source_id: String,
    target_id: String,
    link_type: String,
    strength: f64,
    created_at: String,
    reinforcements: u32,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Fresh in-memory database.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn row_to_memory(&self, row: MemoryRow) -> CoreResult<MemoryEntry> {
        let embedding: Option<Vec<f32>> = match row.embedding {
            Some(json) => {
                let v: Vec<f32> = serde_json::from_str(&json)?;
                (v.len() == EMBEDDING_DIM).then_some(v)
            }
            None => None,
        };
        Ok(MemoryEntry {
            category: row.category.parse().map_err(CoreError::MalformedEntry)?,
            source: row.source.parse().map_err(CoreError::MalformedEntry)?,
            timestamp: parse_time(&row.timestamp, &row.id)?,
            last_accessed: parse_time(&row.last_accessed, &row.id)?,
            keywords: serde_json::from_str(&row.keywords)?,
            relations: serde_json::from_str(&row.relations)?,
            id: row.id,
            content: row.content,
            importance: row.importance,
            access_count: row.access_count,
            embedding,
            consolidated: row.consolidated,
            decay: row.decay,
            activation_level: row.activation_level,
            emotional_valence: row.emotional_valence,
            context_signature: row.context_signature,
        })
    }
}

fn parse_time(value: &str, owner: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::MalformedEntry(format!("{owner}: bad timestamp {value}: {e}")))
}

impl MemoryRepository for SqliteRepository {
    fn load_memories(&self) -> CoreResult<Vec<MemoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, keywords, category, timestamp, importance, source, \
             access_count, last_accessed, embedding, relations, consolidated, decay, \
             activation_level, emotional_valence, context_signature \
             FROM memories ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MemoryRow {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    keywords: row.get(2)?,
                    category: row.get(3)?,
                    timestamp: row.get(4)?,
                    importance: row.get(5)?,
                    source: row.get(6)?,
                    access_count: row.get(7)?,
                    last_accessed: row.get(8)?,
                    embedding: row.get(9)?,
                    relations: row.get(10)?,
                    consolidated: row.get(11)?,
                    decay: row.get(12)?,
                    activation_level: row.get(13)?,
                    emotional_valence: row.get(14)?,
                    context_signature: row.get(15)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|r| self.row_to_memory(r)).collect()
    }

    fn save_memories(&mut self, entries: &[MemoryEntry]) -> CoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO memories (id, content, keywords, category, timestamp, importance, \
                 source, access_count, last_accessed, embedding, relations, consolidated, decay, \
                 activation_level, emotional_valence, context_signature) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) \
                 ON CONFLICT(id) DO UPDATE SET \
                 keywords = excluded.keywords, access_count = excluded.access_count, \
                 last_accessed = excluded.last_accessed, embedding = excluded.embedding, \
                 relations = excluded.relations, consolidated = excluded.consolidated, \
                 decay = excluded.decay, activation_level = excluded.activation_level",
            )?;
            for entry in entries {
                let embedding = entry
                    .embedding
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    entry.id,
                    entry.content,
                    serde_json::to_string(&entry.keywords)?,
                    entry.category.as_str(),
                    entry.timestamp.to_rfc3339(),
                    entry.importance,
                    entry.source.as_str(),
                    entry.access_count,
                    entry.last_accessed.to_rfc3339(),
                    embedding,
                    serde_json::to_string(&entry.relations)?,
                    entry.consolidated,
                    entry.decay,
                    entry.activation_level,
                    entry.emotional_valence,
                    entry.context_signature,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = entries.len(), "memories saved");
        Ok(())
    }

    fn load_links(&self) -> CoreResult<Vec<AssociativeLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, target_id, link_type, strength, created_at, reinforcements \
             FROM associative_links ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LinkRow {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    link_type: row.get(2)?,
                    strength: row.get(3)?,
                    created_at: row.get(4)?,
                    reinforcements: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|r| -> CoreResult<AssociativeLink> {
                Ok(AssociativeLink {
                    link_type: r.link_type.parse().map_err(CoreError::MalformedEntry)?,
                    created_at: parse_time(&r.created_at, &r.source_id)?,
                    source_id: r.source_id,
                    target_id: r.target_id,
                    strength: r.strength,
                    reinforcements: r.reinforcements,
                })
            })
            .collect()
    }

    fn save_links(&mut self, links: &[AssociativeLink]) -> CoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO associative_links \
                 (source_id, target_id, link_type, strength, created_at, reinforcements) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(source_id, target_id, link_type) DO UPDATE SET \
                 strength = MAX(associative_links.strength, excluded.strength), \
                 reinforcements = MAX(associative_links.reinforcements, excluded.reinforcements)",
            )?;
            for link in links {
                stmt.execute(params![
                    link.source_id,
                    link.target_id,
                    link.link_type.as_str(),
                    link.strength,
                    link.created_at.to_rfc3339(),
                    link.reinforcements,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = links.len(), "links saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{create_memory, ensure_embedding, NewMemory};
    use crate::memory::types::{LinkType, MemoryCategory};

    #[test]
    fn memories_round_trip() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let mut entry = create_memory(
            NewMemory::new("User's cat is named Miso", MemoryCategory::Entity),
            Utc::now(),
        )
        .unwrap();
        ensure_embedding(&mut entry);

        repo.save_memories(std::slice::from_ref(&entry)).unwrap();
        let loaded = repo.load_memories().unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, entry.id);
        assert_eq!(loaded[0].keywords, entry.keywords);
        assert_eq!(loaded[0].category, MemoryCategory::Entity);
        assert_eq!(loaded[0].embedding.as_ref().map(Vec::len), Some(EMBEDDING_DIM));
    }

    #[test]
    fn save_is_upsert() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let mut entry =
            create_memory(NewMemory::new("standup at 9", MemoryCategory::Context), Utc::now())
                .unwrap();
        repo.save_memories(std::slice::from_ref(&entry)).unwrap();

        entry.access_count = 4;
        entry.decay = 1.0;
        repo.save_memories(std::slice::from_ref(&entry)).unwrap();

        let loaded = repo.load_memories().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].access_count, 4);
        assert_eq!(loaded[0].decay, 1.0);
    }

    #[test]
    fn link_upsert_never_weakens() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let mut link = AssociativeLink {
            source_id: "a".into(),
            target_id: "b".into(),
            strength: 0.7,
            link_type: LinkType::Semantic,
            created_at: Utc::now(),
            reinforcements: 2,
        };
        repo.save_links(std::slice::from_ref(&link)).unwrap();
        link.strength = 0.2;
        link.reinforcements = 0;
        repo.save_links(std::slice::from_ref(&link)).unwrap();

        let loaded = repo.load_links().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].strength, 0.7);
        assert_eq!(loaded[0].reinforcements, 2);
    }

    #[test]
    fn bad_category_surfaces_as_malformed() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.connection()
            .execute_batch("PRAGMA ignore_check_constraints = ON;")
            .unwrap();
        repo.connection()
            .execute(
                "INSERT INTO memories (id, content, category, timestamp, importance, source, \
                 last_accessed, decay) VALUES ('x', 'c', 'mood', '2026-01-01T00:00:00Z', 3, \
                 'conversation', '2026-01-01T00:00:00Z', 0.5)",
                [],
            )
            .unwrap();
        assert!(matches!(repo.load_memories(), Err(CoreError::MalformedEntry(_))));
    }
}
