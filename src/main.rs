use anyhow::Result;
use clap::{Parser, Subcommand};
use reverie::{cli, config, server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reverie",
    version,
    about = "Associative memory and per-turn cognition for LLM chat agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio unless --http or transport = "http")
    Serve {
        /// Serve streamable HTTP on the configured host and port
        #[arg(long)]
        http: bool,
    },
    /// Store a memory
    Remember {
        content: String,
        #[arg(short, long, default_value = "fact")]
        category: String,
        /// 1-5
        #[arg(short, long)]
        importance: Option<u8>,
        /// Comma-separated keywords; extracted from the content when omitted
        #[arg(short, long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,
    },
    /// Search memories
    Search {
        query: String,
        /// Restrict to a category (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Run the cognition pipeline on one message and print its context injections
    Analyze {
        message: String,
        /// Print the full turn report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show memory statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::ReverieConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Remember {
            content,
            category,
            importance,
            keywords,
        } => cli::remember(config, &content, &category, importance, keywords)?,
        Command::Search {
            query,
            category,
            limit,
        } => cli::search(config, &query, &category, limit)?,
        Command::Analyze { message, json } => cli::analyze(config, &message, json)?,
        Command::Stats => cli::stats(config)?,
    }

    Ok(())
}
