//! Request handlers for all API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use std::str::FromStr;
use tracing::{info, warn};

use super::models::*;
use super::AppState;
use crate::marketplace::query::{present, BrowseQuery};
use crate::marketplace::ListingWindow;
use crate::marketplace::CacheStats;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

// ============================================================================
// Listings
// ============================================================================

fn browse_query(
    page: Option<usize>,
    collection: Option<String>,
    search: Option<String>,
    sort: Option<String>,
) -> BrowseQuery {
    let defaults = BrowseQuery::default();
    BrowseQuery {
        collection: collection.unwrap_or(defaults.collection),
        search: search.unwrap_or(defaults.search),
        sort: sort.unwrap_or(defaults.sort),
        page: page.unwrap_or(defaults.page),
    }
}

pub async fn get_listings(
    State(state): State<AppState>,
    Query(params): Query<ListingsQuery>,
) -> Result<Json<ListingsPageResponse>, ApiError> {
    let window = ListingWindow {
        offset: params.offset.unwrap_or(0),
        limit: params.limit.unwrap_or(state.config.listing_window),
    };

    let session = state.sessions.session_for(params.session.as_deref()).await;
    let items = match session.load(window).await {
        Ok(Some(items)) => items,
        Ok(None) => {
            info!(
                "Listings request for {:?} superseded by a newer one in session {:?}",
                window, params.session
            );
            return Err(api_error(
                StatusCode::CONFLICT,
                "Request superseded by a newer listings request",
                None,
            ));
        }
        Err(e) => {
            warn!("Failed to load listings {:?}: {}", window, e);
            return Err(api_error(
                StatusCode::BAD_GATEWAY,
                "Failed to load marketplace listings",
                Some(e.to_string()),
            ));
        }
    };

    let query = browse_query(params.page, params.collection, params.search, params.sort);
    let page = present(&items, &query, state.config.page_size);
    Ok(Json(ListingsPageResponse::new(page, window.offset, window.limit)))
}

/// Re-page a session's last loaded window without touching the chain.
pub async fn get_session_listings(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Query(params): Query<SessionPageQuery>,
) -> Result<Json<ListingsPageResponse>, ApiError> {
    let loaded = match state.sessions.get(&session).await {
        Some(browse) => browse.current().await,
        None => None,
    };

    let loaded = match loaded {
        Some(loaded) => loaded,
        None => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                "No listings loaded for this session",
                Some(session),
            ));
        }
    };

    let query = browse_query(params.page, params.collection, params.search, params.sort);
    let page = present(&loaded.items, &query, state.config.page_size);
    Ok(Json(ListingsPageResponse::new(
        page,
        loaded.window.offset,
        loaded.window.limit,
    )))
}

// ============================================================================
// Token metadata
// ============================================================================

pub async fn get_token_metadata(
    State(state): State<AppState>,
    Path((contract, token_id)): Path<(String, String)>,
) -> Result<Json<TokenMetadataResponse>, ApiError> {
    let contract = Address::from_str(&contract)
        .map(|address| to_checksum(&address, None))
        .map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                "contract must be a 20-byte hex address",
                Some(e.to_string()),
            )
        })?;

    let token_id = U256::from_dec_str(&token_id).map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            "token_id must be a base-10 unsigned integer",
            Some(e.to_string()),
        )
    })?;

    let (metadata, collection_name) = state.sessions.enricher().resolve(&contract, token_id).await;

    Ok(Json(TokenMetadataResponse {
        nft_contract: contract,
        token_id: token_id.to_string(),
        collection_name,
        metadata,
    }))
}

pub async fn get_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.sessions.enricher().cache().stats().await)
}
