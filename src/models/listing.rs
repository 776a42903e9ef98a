use chrono::{DateTime, TimeZone, Utc};
use ethers::types::U256;

use super::metadata::Metadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub seller: String,       // Seller address
    pub nft_contract: String, // Collection contract address
    pub token_id: U256,
    pub price: U256,          // Price in the smallest unit (wei)
    pub active: bool,
    pub listed_at: u64,       // Unix timestamp (seconds)
}

impl Listing {
    pub fn listed_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.listed_at).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

/// A listing with its resolved metadata and display collection name attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedListing {
    pub listing: Listing,
    pub metadata: Metadata,
    pub collection_name: String,
}

/// `<contract>-<token id in base 10>`
pub fn cache_key(contract: &str, token_id: U256) -> String {
    format!("{}-{}", contract, token_id)
}

/// Elided form of an address used when no collection name is available:
/// first 6 and last 4 characters joined by `...`.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
