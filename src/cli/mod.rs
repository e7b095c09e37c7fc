//! Terminal subcommands. Each opens the configured database, runs one operation,
//! and prints a human-readable result to stdout.

pub mod analyze;
pub mod remember;
pub mod search;
pub mod stats;

pub use analyze::analyze;
pub use remember::remember;
pub use search::search;
pub use stats::stats;
