use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MarketError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Chain read error: {0}")]
    ChainRead(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    /// Short label used in log lines and error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::Transport(_) => "transport",
            MarketError::ChainRead(_) => "chain_read",
            MarketError::Parse(_) => "parse",
            MarketError::NotFound(_) => "not_found",
            MarketError::Timeout(_) => "timeout",
            MarketError::Config(_) => "config",
        }
    }
}
