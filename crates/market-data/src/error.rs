//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Unknown or unconfigured symbol
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Requested data is not available (nothing fresh cached)
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Push transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Subscription bookkeeping failure
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// No feed adapter registered for the requested mode
    #[error("No feed adapter for mode: {0}")]
    NoFeedForMode(String),
}

impl MarketDataError {
    pub fn transport(msg: impl Into<String>) -> Self {
        MarketDataError::Transport(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MarketDataError>;
