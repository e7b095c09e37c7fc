//! CLI `analyze` command: run the cognition pipeline on a single message.

use anyhow::Result;
use chrono::Utc;

use crate::cognition::injection::{render_injections, total_token_cost};
use crate::config::ReverieConfig;

/// Analyze `message` and print the resulting context injections, or the full
/// turn report as JSON.
pub fn analyze(config: ReverieConfig, message: &str, json: bool) -> Result<()> {
    let mut session = crate::server::open_session(config)?;
    let frame = session.process_turn("cli", message, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&frame.report())?);
        return Ok(());
    }

    println!("Turn Analysis");
    println!("{}", "=".repeat(40));
    println!(
        "  Emotion:      {} ({}, {})",
        frame.emotion.dominant_emotion,
        frame.emotion.valence.as_str(),
        frame.emotion.arousal.as_str()
    );
    println!("  Intent:       {}", frame.intent.primary.as_str());
    println!(
        "  Complexity:   {}",
        frame.metacognition.reasoning_complexity.as_str()
    );
    println!("  Phase:        {}", frame.discourse.phase.as_str());
    println!(
        "  Memories:     {} retrieved, {} associated",
        frame.retrieved.len(),
        frame.associative.len()
    );
    println!();

    if frame.injections.is_empty() {
        println!("No context injections.");
        return Ok(());
    }
    println!(
        "Context injections (~{} tokens):",
        total_token_cost(&frame.injections)
    );
    println!("{}", render_injections(&frame.injections));

    Ok(())
}
