// Service bootstrap.
// Loads configuration, wires the shared cache and upstream client,
// and serves the HTTP front-end.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use birdfeed::cache::ResponseCache;
use birdfeed::config::Config;
use birdfeed::http::{AppState, router};
use birdfeed::upstream::client::UpstreamClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let cache = Arc::new(ResponseCache::new());
    let client = UpstreamClient::new(&config, Arc::clone(&cache))?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = addr.as_str(),
        api_base = config.api_base.as_str(),
        cache_ttl = config.cache_ttl,
        "birdfeed listening"
    );

    let state = Arc::new(AppState { client, config });
    axum::serve(listener, router(state)).await?;
    Ok(())
}
