mod ai_client;
mod analysis;
mod config;
mod dispatch;
mod errors;
mod extract;
mod job_spec;
mod parsing;
mod routes;
mod scoring;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::analysis::analyzer::Analyzer;
use crate::config::Config;
use crate::dispatch::cache::{InMemoryCache, RedisCache, ResponseCache};
use crate::dispatch::AiCollaborator;
use crate::extract::PlainTextExtractor;
use crate::routes::build_router;
use crate::scoring::engine::ScoringConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rescore API v{}", env!("CARGO_PKG_VERSION"));

    // Cache backend: Redis when configured, process-local map otherwise.
    let cache: Arc<dyn ResponseCache> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.clone())?;
            info!("AI response cache backed by Redis");
            Arc::new(RedisCache::new(client))
        }
        None => {
            info!("REDIS_URL unset; AI response cache is process-local");
            Arc::new(InMemoryCache::new())
        }
    };

    // AI collaborator: absent key means every request resolves
    // deterministic-only.
    let ai: Option<Arc<dyn AiCollaborator>> = match &config.ai_api_key {
        Some(key) => {
            info!("AI collaborator initialized (model: {})", ai_client::MODEL);
            Some(Arc::new(AiClient::new(key.clone())))
        }
        None => {
            info!("ANTHROPIC_API_KEY unset; AI augmentation disabled");
            None
        }
    };

    let analyzer = Analyzer::new(
        ScoringConfig::default(),
        cache,
        ai,
        Duration::from_secs(config.ai_timeout_secs),
        Duration::from_secs(config.cache_ttl_secs),
    )?;

    let state = AppState {
        analyzer: Arc::new(analyzer),
        extractor: Arc::new(PlainTextExtractor),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
