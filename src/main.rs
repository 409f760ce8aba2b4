mod api;
mod config;
mod embed;
mod repository;
mod search;
#[cfg(test)]
mod testing;

pub const USER_AGENT: &str = concat!("lexsearch/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

use config::Config;
use embed::{Embedder, HashingEmbedder};
use repository::HttpRepositoryClient;
use search::SearchEngine;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lexsearch=info".parse()?),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let endpoints = config.load_endpoints()?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(config.fetch_timeout())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    let client = HttpRepositoryClient::new(http, config.fetch_timeout());

    let embedder = HashingEmbedder::shared();
    info!(dimension = embedder.dimension(), "embedder ready");

    let engine = SearchEngine::new(embedder, client, endpoints)
        .with_fetch_timeout(config.fetch_timeout())
        .with_scoring_concurrency(config.scoring_concurrency);
    for endpoint in engine.endpoints() {
        info!(
            endpoint = %endpoint.name,
            address = %endpoint.address,
            authenticated = endpoint.credential.is_some(),
            "repository configured"
        );
    }

    let app = api::router(Arc::new(engine), &config.cors_origins);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .inspect_err(|e| tracing::error!("failed to bind {}: {e}", config.bind))?;
    info!(addr = %listener.local_addr()?, "starting legal search API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
