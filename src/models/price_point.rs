use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One close in an ascending daily price series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// The resolved current price for a ticker after a fetch round.
///
/// `price` is `None` when the fetch failed and no cached value exists; such
/// tickers are excluded from weighted metrics. `stale` marks prices served
/// from the quote cache after a timeout or provider error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerQuote {
    pub ticker: String,
    pub price: Option<f64>,
    pub stale: bool,
}
