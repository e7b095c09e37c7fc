//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open the memory
//! database, load a [`Session`], and expose it through [`ReverieTools`].

use crate::config::ReverieConfig;
use crate::db;
use crate::memory::repository::SqliteRepository;
use crate::session::Session;
use crate::tools::{ReverieTools, SharedSession};
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Open the configured database and load a session over it.
pub fn open_session(config: ReverieConfig) -> Result<Session<SqliteRepository>> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    Ok(Session::open(SqliteRepository::new(conn), config))
}

fn setup_shared_state(config: ReverieConfig) -> Result<SharedSession> {
    Ok(Arc::new(Mutex::new(open_session(config)?)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: ReverieConfig) -> Result<()> {
    tracing::info!("starting Reverie MCP server on stdio");

    let session = setup_shared_state(config)?;

    let tools = ReverieTools::new(session);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP. Every HTTP session shares the same
/// memory store; conversations are kept apart by their conversation id.
pub async fn serve_http(config: ReverieConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(addr = %bind_addr, "starting Reverie MCP server on HTTP");

    let session = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(ReverieTools::new(Arc::clone(&session))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
