use anyhow::Result;
use chrono::Utc;

use crate::config::ReverieConfig;
use crate::memory::types::{LinkType, MemoryCategory};

/// Display memory statistics in the terminal.
pub fn stats(config: ReverieConfig) -> Result<()> {
    let session = crate::server::open_session(config)?;
    let response = session.stats(Utc::now());

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Consolidated:        {}", response.consolidated_memories);
    println!("  Total accesses:      {}", response.total_accesses);
    println!("  Average decay:       {:.3}", response.average_decay);
    println!("  Effective decay:     {:.3}", response.average_effective_decay);
    println!();

    println!("By Category:");
    for c in MemoryCategory::ALL {
        let count = response.by_category.get(c.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", c.as_str(), count);
    }
    println!();

    println!("Associative links:     {}", response.associative_links);
    for t in LinkType::ALL {
        let count = response.by_link_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", t.as_str(), count);
    }

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
