pub mod ipfs;
pub mod metadata;
