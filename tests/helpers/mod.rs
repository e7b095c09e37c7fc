#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use reverie::config::ReverieConfig;
use reverie::error::{CoreError, CoreResult};
use reverie::memory::repository::{MemoryRepository, SqliteRepository};
use reverie::memory::store::{create_memory, NewMemory};
use reverie::memory::types::{AssociativeLink, LinkType, MemoryCategory, MemoryEntry};
use reverie::session::Session;

/// Fresh in-memory repository.
pub fn test_repo() -> SqliteRepository {
    SqliteRepository::open_in_memory().unwrap()
}

/// Session over an empty in-memory repository with default config.
pub fn test_session() -> Session<SqliteRepository> {
    Session::open(test_repo(), ReverieConfig::default())
}

/// Build a valid memory created now.
pub fn memory(content: &str, category: MemoryCategory) -> MemoryEntry {
    create_memory(NewMemory::new(content, category), Utc::now()).unwrap()
}

/// Build a valid memory last touched `days_ago` days before now.
pub fn memory_aged(content: &str, category: MemoryCategory, days_ago: i64) -> MemoryEntry {
    let when = Utc::now() - Duration::days(days_ago);
    create_memory(NewMemory::new(content, category), when).unwrap()
}

pub fn link(source: &MemoryEntry, target: &MemoryEntry, strength: f64) -> AssociativeLink {
    link_at(source, target, strength, Utc::now())
}

pub fn link_at(
    source: &MemoryEntry,
    target: &MemoryEntry,
    strength: f64,
    created_at: DateTime<Utc>,
) -> AssociativeLink {
    AssociativeLink {
        source_id: source.id.clone(),
        target_id: target.id.clone(),
        strength,
        link_type: LinkType::Topical,
        created_at,
        reinforcements: 0,
    }
}

/// Repository whose every operation fails, for exercising best-effort paths.
#[derive(Default)]
pub struct FailingRepository {
    pub save_attempts: usize,
}

impl MemoryRepository for FailingRepository {
    fn load_memories(&self) -> CoreResult<Vec<MemoryEntry>> {
        Err(CoreError::Persistence(rusqlite::Error::InvalidQuery))
    }

    fn save_memories(&mut self, _entries: &[MemoryEntry]) -> CoreResult<()> {
        self.save_attempts += 1;
        Err(CoreError::Persistence(rusqlite::Error::InvalidQuery))
    }

    fn load_links(&self) -> CoreResult<Vec<AssociativeLink>> {
        Err(CoreError::Persistence(rusqlite::Error::InvalidQuery))
    }

    fn save_links(&mut self, _links: &[AssociativeLink]) -> CoreResult<()> {
        self.save_attempts += 1;
        Err(CoreError::Persistence(rusqlite::Error::InvalidQuery))
    }
}
