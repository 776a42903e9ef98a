//! Enrichment Orchestrator
//!
//! Attaches off-chain metadata and a collection display name to every listing
//! of a batch. Items resolve concurrently, each in its own task; whatever goes
//! wrong for one item is turned into fallback values for that item only, and
//! the batch always comes back complete and in input order.

use ethers::types::U256;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::cache::MetadataCache;
use crate::api::metadata::MetadataFetcher;
use crate::chain::ChainReader;
use crate::error::MarketError;
use crate::models::{
    cache_key, fallback_metadata, truncate_address, unresolved_metadata, EnrichedListing, Listing,
    Metadata,
};

#[derive(Clone)]
pub struct Enricher {
    chain: Arc<dyn ChainReader>,
    fetcher: Arc<MetadataFetcher>,
    cache: Arc<MetadataCache>,
    chain_timeout: Duration,
}

impl Enricher {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        fetcher: Arc<MetadataFetcher>,
        cache: Arc<MetadataCache>,
        chain_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            fetcher,
            cache,
            chain_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Enrich a batch. The output has one entry per input listing, in the same order.
    pub async fn enrich(&self, listings: Vec<Listing>) -> Vec<EnrichedListing> {
        if listings.is_empty() {
            return Vec::new();
        }

        info!("Enriching batch of {} listings", listings.len());

        let handles: Vec<_> = listings
            .iter()
            .cloned()
            .map(|listing| {
                let enricher = self.clone();
                tokio::spawn(async move { enricher.enrich_one(listing).await })
            })
            .collect();

        let results = join_all(handles).await;

        listings
            .into_iter()
            .zip(results)
            .map(|(listing, result)| match result {
                Ok(enriched) => enriched,
                Err(e) => {
                    error!(
                        "Resolution task for {} #{} aborted: {}",
                        listing.nft_contract, listing.token_id, e
                    );
                    EnrichedListing {
                        metadata: unresolved_metadata(listing.token_id),
                        collection_name: truncate_address(&listing.nft_contract),
                        listing,
                    }
                }
            })
            .collect()
    }

    pub async fn enrich_one(&self, listing: Listing) -> EnrichedListing {
        let (metadata, collection_name) = self.resolve(&listing.nft_contract, listing.token_id).await;
        EnrichedListing {
            listing,
            metadata,
            collection_name,
        }
    }

    /// Resolve metadata and collection display name for one token.
    /// Never fails: unresolvable tokens get fallback metadata, which is cached
    /// like any other result.
    pub async fn resolve(&self, contract: &str, token_id: U256) -> (Metadata, String) {
        let key = cache_key(contract, token_id);

        if let Some(metadata) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            let collection_name = self
                .cache
                .collection_name(contract)
                .await
                .unwrap_or_else(|| truncate_address(contract));
            return (metadata, collection_name);
        }

        let (locator, collection_name) = tokio::join!(
            self.read_locator(contract, token_id),
            self.read_collection_name(contract),
        );

        let metadata = match locator {
            Some(locator) => match self.fetcher.fetch(&locator).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(
                        "Metadata fetch for {} #{} failed ({}): {}; using fallback",
                        contract,
                        token_id,
                        e.kind(),
                        e
                    );
                    fallback_metadata(token_id, &collection_name)
                }
            },
            None => fallback_metadata(token_id, &collection_name),
        };

        let metadata = self.cache.insert(key, metadata).await;
        (metadata, collection_name)
    }

    async fn read_locator(&self, contract: &str, token_id: U256) -> Option<String> {
        let operation = format!("tokenURI {} #{}", contract, token_id);
        match self
            .bounded(&operation, self.chain.read_token_locator(contract, token_id))
            .await
        {
            Ok(locator) => Some(locator),
            Err(e) => {
                warn!(
                    "Could not read locator for {} #{} ({}): {}",
                    contract,
                    token_id,
                    e.kind(),
                    e
                );
                None
            }
        }
    }

    async fn read_collection_name(&self, contract: &str) -> String {
        if let Some(name) = self.cache.collection_name(contract).await {
            return name;
        }

        let operation = format!("name {}", contract);
        match self
            .bounded(&operation, self.chain.read_collection_name(contract))
            .await
        {
            Ok(name) => {
                self.cache.remember_collection_name(contract, &name).await;
                name
            }
            Err(e) => {
                debug!("Collection name unavailable for {} ({}): {}", contract, e.kind(), e);
                truncate_address(contract)
            }
        }
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, MarketError>
    where
        F: Future<Output = Result<T, MarketError>>,
    {
        match tokio::time::timeout(self.chain_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MarketError::Timeout(format!(
                "{} after {:?}",
                operation, self.chain_timeout
            ))),
        }
    }
}
