mod chat;
mod compare;
mod config;
mod embedding;
mod errors;
mod index;
mod ingest;
mod llm_client;
mod models;
mod retrieval;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::build_embedder;
use crate::index::ResumeIndex;
use crate::ingest::extract::PdfTextExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume API v{}", env!("CARGO_PKG_VERSION"));

    // Open the resume index; a half-written or mismatched store stops startup here
    let index = ResumeIndex::open(&config.index_dir, config.embedding_dimension)?;

    let embedder = build_embedder(&config).await?;
    info!(
        "Embedding backend: {} ({} dimensions)",
        embedder.backend(),
        embedder.dimension()
    );
    if embedder.dimension() != index.dimension() {
        anyhow::bail!(
            "embedding backend produces {} dimensions but the index stores {}",
            embedder.dimension(),
            index.dimension()
        );
    }

    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_max_attempts)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState::new(
        config.clone(),
        index,
        embedder,
        Arc::new(PdfTextExtractor),
        Arc::new(llm),
    );
    let index = state.index.clone();

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once a frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Persist anything left unflushed before exiting
    match Arc::try_unwrap(index) {
        Ok(index) => index.into_inner().close()?,
        Err(shared) => {
            shared.write().await.flush()?;
        }
    }
    info!("Resume index closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
