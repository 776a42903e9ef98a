use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod chain;
mod config;
mod error;
mod marketplace;
mod models;
mod web;

use crate::api::metadata::MetadataFetcher;
use crate::chain::client::EvmChainClient;
use crate::config::Config;
use crate::marketplace::{Enricher, MetadataCache, SessionRegistry};
use crate::web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    let chain_client = Arc::new(
        EvmChainClient::connect(
            &config.rpc_url,
            &config.marketplace_address,
            config.chain_id,
            config.chain_timeout(),
        )
        .await
        .context("Failed to initialize chain client")?,
    );

    let fetcher = Arc::new(
        MetadataFetcher::new(&config.ipfs_gateway, config.fetch_timeout())
            .context("Failed to initialize metadata fetcher")?,
    );
    info!("Metadata fetcher using gateway {}", fetcher.gateway());

    // Resolve-once cache shared by every batch for the life of the process
    let cache = Arc::new(MetadataCache::new());

    let enricher = Enricher::new(chain_client.clone(), fetcher, cache, config.chain_timeout());
    let sessions = Arc::new(SessionRegistry::new(chain_client, enricher, config.max_sessions));

    let state = AppState::new(sessions, config.clone());
    web::server::start_server(state).await?;

    Ok(())
}
