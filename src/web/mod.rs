//! Web API module
//!
//! Read-only JSON surface over the enrichment pipeline and the query engine.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

use std::sync::Arc;

use crate::config::Config;
use crate::marketplace::SessionRegistry;

/// Shared application state for all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-consumer browse sessions over the enriched listing windows
    pub sessions: Arc<SessionRegistry>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, config: Arc<Config>) -> Self {
        Self { sessions, config }
    }
}
