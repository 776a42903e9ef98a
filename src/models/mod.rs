pub mod listing;
pub mod metadata;

// Re-export commonly used types
pub use listing::{cache_key, truncate_address, EnrichedListing, Listing};
pub use metadata::{fallback_metadata, unresolved_metadata, Metadata};
