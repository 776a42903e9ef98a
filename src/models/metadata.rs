use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Image shown for items whose metadata could not be resolved.
const PLACEHOLDER_IMAGE_BASE: &str = "https://via.placeholder.com/400x400?text=NFT+%23";

/// Name used when a descriptor document has no usable `name`.
pub const UNNAMED_NFT: &str = "Unnamed NFT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub image: String,
}

pub fn placeholder_image(token_id: U256) -> String {
    format!("{}{}", PLACEHOLDER_IMAGE_BASE, token_id)
}

/// Synthetic metadata for an item whose locator or document could not be resolved.
pub fn fallback_metadata(token_id: U256, collection_name: &str) -> Metadata {
    Metadata {
        name: format!("NFT #{}", token_id),
        description: format!("NFT from {}", collection_name),
        image: placeholder_image(token_id),
    }
}

/// Metadata for an item whose resolution aborted unexpectedly.
pub fn unresolved_metadata(token_id: U256) -> Metadata {
    Metadata {
        name: format!("NFT #{}", token_id),
        description: String::new(),
        image: placeholder_image(token_id),
    }
}
