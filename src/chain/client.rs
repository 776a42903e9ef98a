use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use reqwest::Url;
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use super::{ChainReader, ListingSource};
use crate::error::MarketError;
use crate::models::Listing;

mod bindings {
    use ethers::contract::abigen;

    abigen!(
        Erc721Metadata,
        r#"[
            function name() external view returns (string)
            function tokenURI(uint256 tokenId) external view returns (string)
        ]"#
    );

    abigen!(
        NftMarketplace,
        r#"[
            struct Listing { address seller; address nftContract; uint256 tokenId; uint256 price; bool active; uint256 listedAt; }
            function getActiveListings(uint256 offset, uint256 limit) external view returns (Listing[])
        ]"#
    );
}

/// `(seller, nftContract, tokenId, price, active, listedAt)` as decoded from
/// `getActiveListings`.
type RawListing = (Address, Address, U256, U256, bool, U256);

/// JSON-RPC client for an EVM chain hosting the marketplace and its NFT collections.
#[derive(Clone)]
pub struct EvmChainClient {
    provider: Arc<Provider<Http>>,
    marketplace: Address,
}

impl EvmChainClient {
    /// Connects to `rpc_url` and checks the endpoint's chain id against `expected_chain_id`.
    pub async fn connect(
        rpc_url: &str,
        marketplace_address: &str,
        expected_chain_id: u64,
        timeout: Duration,
    ) -> Result<Self, MarketError> {
        let client = Self::new(rpc_url, marketplace_address, timeout)?;

        match client.provider.get_chainid().await {
            Ok(chain_id) if chain_id == U256::from(expected_chain_id) => {
                info!("Successfully connected to RPC {} (chain id {})", rpc_url, chain_id);
            }
            Ok(chain_id) => {
                warn!(
                    "RPC {} reports chain id {}, expected {}",
                    rpc_url, chain_id, expected_chain_id
                );
            }
            Err(e) => {
                error!("Failed to connect to RPC {}: {}", rpc_url, e);
                return Err(MarketError::ChainRead(format!(
                    "Failed to connect to RPC {}: {}",
                    rpc_url, e
                )));
            }
        }

        Ok(client)
    }

    pub fn new(rpc_url: &str, marketplace_address: &str, timeout: Duration) -> Result<Self, MarketError> {
        let url = Url::parse(rpc_url)
            .map_err(|e| MarketError::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Config(format!("Failed to create RPC HTTP client: {}", e)))?;
        let marketplace = parse_address(marketplace_address)
            .map_err(|_| MarketError::Config(format!("Invalid marketplace address {}", marketplace_address)))?;

        Ok(Self {
            provider: Arc::new(Provider::new(Http::new_with_client(url, http_client))),
            marketplace,
        })
    }
}

#[async_trait]
impl ChainReader for EvmChainClient {
    async fn read_token_locator(&self, contract: &str, token_id: U256) -> Result<String, MarketError> {
        let address = parse_address(contract)?;
        let collection = bindings::Erc721Metadata::new(address, self.provider.clone());

        let locator = collection.token_uri(token_id).call().await.map_err(|e| {
            MarketError::ChainRead(format!("tokenURI({}) on {}: {}", token_id, contract, e))
        })?;

        if locator.is_empty() {
            return Err(MarketError::NotFound(format!(
                "empty tokenURI for {} #{}",
                contract, token_id
            )));
        }

        debug!("tokenURI for {} #{}: {}", contract, token_id, locator);
        Ok(locator)
    }

    async fn read_collection_name(&self, contract: &str) -> Result<String, MarketError> {
        let address = parse_address(contract)?;
        let collection = bindings::Erc721Metadata::new(address, self.provider.clone());

        collection
            .name()
            .call()
            .await
            .map_err(|e| MarketError::ChainRead(format!("name() on {}: {}", contract, e)))
    }
}

#[async_trait]
impl ListingSource for EvmChainClient {
    async fn active_listings(&self, offset: u64, limit: u64) -> Result<Vec<Listing>, MarketError> {
        let marketplace = bindings::NftMarketplace::new(self.marketplace, self.provider.clone());

        let raw = marketplace
            .get_active_listings(U256::from(offset), U256::from(limit))
            .call()
            .await
            .map_err(|e| {
                error!("getActiveListings({}, {}) failed: {}", offset, limit, e);
                MarketError::ChainRead(format!("getActiveListings({}, {}): {}", offset, limit, e))
            })?;

        let listings: Vec<Listing> = raw
            .into_iter()
            .map(to_listing)
            .filter(|listing| listing.active)
            .collect();

        debug!("Marketplace returned {} active listings (offset {}, limit {})", listings.len(), offset, limit);
        Ok(listings)
    }
}

fn parse_address(address: &str) -> Result<Address, MarketError> {
    Address::from_str(address)
        .map_err(|e| MarketError::ChainRead(format!("invalid address {}: {}", address, e)))
}

fn to_listing(raw: RawListing) -> Listing {
    let (seller, nft_contract, token_id, price, active, listed_at) = raw;
    let listed_at = if listed_at > U256::from(u64::MAX) {
        u64::MAX
    } else {
        listed_at.as_u64()
    };

    Listing {
        seller: to_checksum(&seller, None),
        nft_contract: to_checksum(&nft_contract, None),
        token_id,
        price,
        active,
        listed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_listing_checksums_addresses() {
        let raw: RawListing = (
            Address::from_str("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap(),
            Address::from_str("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap(),
            U256::from(77u64),
            U256::exp10(18),
            true,
            U256::from(1_700_000_000u64),
        );

        let listing = to_listing(raw);
        assert_eq!(listing.seller, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(listing.nft_contract, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
        assert_eq!(listing.token_id, U256::from(77u64));
        assert_eq!(listing.listed_at, 1_700_000_000);
        assert_eq!(listing.price, U256::exp10(18));
    }

    #[test]
    fn test_inactive_rows_are_kept_as_inactive() {
        let raw: RawListing = (Address::zero(), Address::zero(), U256::from(3u64), U256::one(), false, U256::one());
        assert!(!to_listing(raw).active);
    }

    #[test]
    fn test_to_listing_saturates_timestamp() {
        let raw: RawListing = (Address::zero(), Address::zero(), U256::one(), U256::one(), true, U256::MAX);
        assert_eq!(to_listing(raw).listed_at, u64::MAX);
    }

    #[test]
    fn test_invalid_address_rejected() {
        assert!(matches!(parse_address("not-an-address"), Err(MarketError::ChainRead(_))));
    }

    #[test]
    fn test_new_rejects_bad_rpc_url() {
        let result = EvmChainClient::new("not a url", "0x5FbDB2315678afecb367f032d93F642f64180aa3", Duration::from_secs(1));
        assert!(matches!(result, Err(MarketError::Config(_))));
    }
}
