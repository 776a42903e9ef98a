//! Metadata document client.
//!
//! Fetches a token's descriptor document (ERC-721 `tokenURI` target) over HTTP,
//! rewriting `ipfs://` locators through the configured gateway first.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::ipfs::normalize;
use crate::error::MarketError;
use crate::models::metadata::{Metadata, UNNAMED_NFT};

/// Descriptor document as served by the token's locator. Only the fields we
/// display are read; everything else is ignored.
#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl MetadataDocument {
    fn into_metadata(self, gateway: &str) -> Metadata {
        Metadata {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNNAMED_NFT.to_string()),
            description: self.description.unwrap_or_default(),
            image: self
                .image
                .map(|image| normalize(&image, gateway))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    gateway: String,
}

impl MetadataFetcher {
    pub fn new(gateway: &str, timeout: Duration) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            gateway: gateway.to_string(),
        })
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Fetches and parses the document behind `locator`.
    /// Failures are logged here and handed back as values for the caller's
    /// fallback policy.
    pub async fn fetch(&self, locator: &str) -> Result<Metadata, MarketError> {
        let url = normalize(locator, &self.gateway);
        debug!("Fetching metadata document: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Metadata fetch timed out for {}", url);
                return Err(MarketError::Timeout(format!("GET {}", url)));
            }
            Err(e) => {
                warn!("Metadata fetch failed for {}: {}", url, e);
                return Err(MarketError::Transport(format!("GET {}: {}", url, e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Metadata server returned {} for {}", status, url);
            return Err(MarketError::Transport(format!("GET {} returned {}", url, status)));
        }

        let body = response.text().await.map_err(|e| {
            warn!("Failed to read metadata body from {}: {}", url, e);
            if e.is_timeout() {
                MarketError::Timeout(format!("GET {}", url))
            } else {
                MarketError::Transport(format!("GET {}: {}", url, e))
            }
        })?;

        let document: MetadataDocument = serde_json::from_str(&body).map_err(|e| {
            warn!("Malformed metadata document at {}: {}", url, e);
            MarketError::Parse(format!("{}: {}", url, e))
        })?;

        Ok(document.into_metadata(&self.gateway))
    }
}
