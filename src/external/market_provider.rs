use async_trait::async_trait;
use thiserror::Error;

use crate::models::PricePoint;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Market-data collaborator: current quotes plus ordered daily close series
/// for tickers and the benchmark index.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent close/trade price for a ticker.
    async fn quote(&self, ticker: &str) -> Result<f64, ProviderError>;

    /// Ascending daily close series covering the trailing `days` window.
    async fn history(&self, ticker: &str, days: u32) -> Result<Vec<PricePoint>, ProviderError>;

    /// Ascending daily close series for the reference benchmark index.
    async fn benchmark(&self, days: u32) -> Result<Vec<PricePoint>, ProviderError>;
}
