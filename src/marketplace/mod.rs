pub mod cache;
pub mod enricher;
pub mod query;
pub mod session;

pub use cache::{CacheStats, MetadataCache};
pub use enricher::Enricher;
pub use session::{ListingWindow, SessionRegistry};
