//! Request and Response DTOs for the Web API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::query::ListingsPage;
use crate::models::{EnrichedListing, Metadata};

// ============================================================================
// Health & Errors
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

// ============================================================================
// Listings
// ============================================================================

/// Query string of `GET /api/listings`: consumer session, upstream window
/// plus browse parameters.
#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    pub session: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub page: Option<usize>,
    pub collection: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

/// Query string of `GET /api/sessions/:session/listings`: browse parameters
/// over the session's last loaded window.
#[derive(Debug, Deserialize)]
pub struct SessionPageQuery {
    pub page: Option<usize>,
    pub collection: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

/// Token ids and prices are 256-bit and rendered as decimal strings.
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub seller: String,
    pub nft_contract: String,
    pub token_id: String,
    pub price: String,
    pub active: bool,
    pub listed_at: u64,
    pub listed_at_utc: Option<DateTime<Utc>>,
    pub collection_name: String,
    pub metadata: Metadata,
}

impl From<&EnrichedListing> for ListingResponse {
    fn from(item: &EnrichedListing) -> Self {
        Self {
            seller: item.listing.seller.clone(),
            nft_contract: item.listing.nft_contract.clone(),
            token_id: item.listing.token_id.to_string(),
            price: item.listing.price.to_string(),
            active: item.listing.active,
            listed_at: item.listing.listed_at,
            listed_at_utc: item.listing.listed_at_utc(),
            collection_name: item.collection_name.clone(),
            metadata: item.metadata.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingsPageResponse {
    pub items: Vec<ListingResponse>,
    pub page: usize,
    pub page_count: usize,
    pub total_matches: usize,
    pub collections: Vec<String>,
    pub offset: u64,
    pub limit: u64,
}

impl ListingsPageResponse {
    pub fn new(page: ListingsPage, offset: u64, limit: u64) -> Self {
        Self {
            items: page.items.iter().map(ListingResponse::from).collect(),
            page: page.page,
            page_count: page.page_count,
            total_matches: page.total_matches,
            collections: page.collections,
            offset,
            limit,
        }
    }
}

// ============================================================================
// Single token metadata
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TokenMetadataResponse {
    pub nft_contract: String,
    pub token_id: String,
    pub collection_name: String,
    pub metadata: Metadata,
}
