//! On-chain collaborators consumed by the enrichment pipeline.

pub mod client;

use async_trait::async_trait;
use ethers::types::U256;

use crate::error::MarketError;
use crate::models::Listing;

/// Read access to NFT collection contracts.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The descriptor-document locator of a token (`tokenURI`).
    async fn read_token_locator(&self, contract: &str, token_id: U256) -> Result<String, MarketError>;

    /// The collection's display name (`name()`).
    async fn read_collection_name(&self, contract: &str) -> Result<String, MarketError>;
}

/// Supplies active marketplace listings by offset/limit window.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn active_listings(&self, offset: u64, limit: u64) -> Result<Vec<Listing>, MarketError>;
}
