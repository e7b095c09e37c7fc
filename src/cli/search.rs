use anyhow::Result;
use chrono::Utc;

use crate::config::ReverieConfig;
use crate::memory::search::SearchFilter;
use crate::memory::store::truncate_preview;
use crate::memory::types::MemoryCategory;

/// Run a search from the terminal.
pub fn search(
    config: ReverieConfig,
    query: &str,
    categories: &[String],
    limit: Option<usize>,
) -> Result<()> {
    let categories = if categories.is_empty() {
        None
    } else {
        Some(
            categories
                .iter()
                .map(|c| c.parse::<MemoryCategory>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?,
        )
    };
    let filter = SearchFilter {
        categories,
        min_score: config.retrieval.min_score,
    };

    let mut session = crate::server::open_session(config)?;
    let results = session.recall(query, &filter, limit, Utc::now());

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (importance: {}, score: {:.3}, match: {})",
            i + 1,
            result.memory.category,
            result.memory.id,
            result.memory.importance,
            result.score,
            result.match_type,
        );
        println!("     {}", truncate_preview(&result.memory.content, 120));
        println!();
    }

    Ok(())
}
