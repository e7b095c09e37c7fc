use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::ReverieConfig;
use crate::memory::store::NewMemory;
use crate::memory::types::MemoryCategory;

/// Store one memory from the terminal.
pub fn remember(
    config: ReverieConfig,
    content: &str,
    category: &str,
    importance: Option<u8>,
    keywords: Option<Vec<String>>,
) -> Result<()> {
    let category: MemoryCategory = category.parse().map_err(anyhow::Error::msg)?;
    let mut session = crate::server::open_session(config)?;

    let mut new = NewMemory::new(content, category);
    if let Some(importance) = importance {
        new = new.with_importance(importance);
    }
    if let Some(keywords) = keywords {
        new = new.with_keywords(keywords);
    }

    let remembered = session
        .remember(new, Utc::now())
        .context("failed to store memory")?;

    println!("{}", remembered.acknowledgment);
    if remembered.deduplicated {
        println!("  (already known; reinforced {})", remembered.entry.id);
    } else {
        println!("  id: {}", remembered.entry.id);
    }
    Ok(())
}
