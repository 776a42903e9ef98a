//! Rewrites content-addressed `ipfs://` locators into fetchable gateway URLs.

pub const IPFS_SCHEME: &str = "ipfs://";
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Rewrites `ipfs://<cid>[/path]` to `<gateway><cid>[/path]`.
/// Anything else, including malformed input, is returned unchanged.
pub fn normalize(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix(IPFS_SCHEME) {
        Some(rest) if gateway.ends_with('/') => format!("{}{}", gateway, rest),
        Some(rest) => format!("{}/{}", gateway, rest),
        None => uri.to_string(),
    }
}
