use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::api::ipfs::DEFAULT_IPFS_GATEWAY;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub marketplace_address: String,

    pub ipfs_gateway: String,
    pub fetch_timeout_secs: u64,
    pub chain_timeout_secs: u64,

    pub page_size: usize,
    pub listing_window: u64,
    pub max_sessions: usize,

    pub api_host: Option<String>,
    pub api_port: Option<u16>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            rpc_url: lookup("RPC_URL").context("RPC_URL not set in environment")?,
            chain_id: parse_or("CHAIN_ID", &lookup, 1)?,
            marketplace_address: lookup("MARKETPLACE_ADDRESS")
                .context("MARKETPLACE_ADDRESS not set in environment")?,

            ipfs_gateway: lookup("IPFS_GATEWAY")
                .unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string()),
            fetch_timeout_secs: parse_or("FETCH_TIMEOUT_SECS", &lookup, 10)?,
            chain_timeout_secs: parse_or("CHAIN_TIMEOUT_SECS", &lookup, 10)?,

            page_size: parse_or("PAGE_SIZE", &lookup, 20)?,
            listing_window: parse_or("LISTING_WINDOW", &lookup, 100)?,
            max_sessions: parse_or("MAX_SESSIONS", &lookup, 1024)?,

            api_host: lookup("API_HOST"),
            api_port: lookup("API_PORT")
                .map(|v| v.trim().parse())
                .transpose()
                .context("Failed to parse API_PORT")?,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn chain_timeout(&self) -> Duration {
        Duration::from_secs(self.chain_timeout_secs)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}
