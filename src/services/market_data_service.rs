use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::config::FetchConfig;
use crate::errors::AppError;
use crate::external::market_provider::{MarketDataProvider, ProviderError};
use crate::models::{PricePoint, TickerQuote};
use crate::services::quote_cache::QuoteCache;

/// Outcome of one quote fetch round: resolved quotes in input order plus the
/// provider errors behind any unresolved or degraded tickers.
pub struct QuoteBatch {
    pub quotes: Vec<TickerQuote>,
    pub failures: Vec<ProviderError>,
}

impl QuoteBatch {
    /// The provider fault to report when not a single ticker resolved, even
    /// from the cache. Rate limiting wins over other fault kinds so the
    /// client sees a 429 with Retry-After instead of a generic upstream
    /// error. Partial rounds report nothing; exclusion handles those.
    pub fn outage_error(&self) -> Option<AppError> {
        if self.failures.is_empty() || self.quotes.iter().any(|q| q.price.is_some()) {
            return None;
        }

        if self
            .failures
            .iter()
            .any(|f| matches!(f, ProviderError::RateLimited))
        {
            return Some(AppError::RateLimited);
        }

        Some(AppError::External(format!(
            "market data provider failed for all {} tickers: {}",
            self.quotes.len(),
            self.failures[0]
        )))
    }
}

/// Fetch current quotes for a set of tickers through a bounded worker pool.
///
/// Each fetch gets its own timeout. A timed-out or failed fetch degrades to
/// the last cached quote (marked stale); with no cached value the ticker
/// comes back with `price: None` and the caller excludes it. The whole batch
/// never fails because of a single ticker; the caller decides what a round
/// with zero resolved prices means via `QuoteBatch::outage_error`.
pub async fn fetch_quotes(
    provider: &dyn MarketDataProvider,
    cache: &QuoteCache,
    fetch: &FetchConfig,
    tickers: &[String],
) -> QuoteBatch {
    let timeout = Duration::from_secs(fetch.timeout_secs);

    // Owned tickers: handler futures must not capture the borrow lifetime.
    let mut results: Vec<(usize, TickerQuote, Option<ProviderError>)> =
        stream::iter(tickers.to_vec().into_iter().enumerate())
            .map(|(idx, ticker)| async move {
                match tokio::time::timeout(timeout, provider.quote(&ticker)).await {
                    Ok(Ok(price)) => {
                        cache.record(&ticker, price);
                        let quote = TickerQuote {
                            ticker,
                            price: Some(price),
                            stale: false,
                        };
                        (idx, quote, None)
                    }
                    Ok(Err(e)) => {
                        warn!("quote fetch for {} failed: {}", ticker, e);
                        (idx, fallback_quote(cache, &ticker), Some(e))
                    }
                    Err(_) => {
                        warn!(
                            "quote fetch for {} timed out after {}s",
                            ticker, fetch.timeout_secs
                        );
                        let timeout_err = ProviderError::Network(format!(
                            "quote fetch for {} timed out after {}s",
                            ticker, fetch.timeout_secs
                        ));
                        (idx, fallback_quote(cache, &ticker), Some(timeout_err))
                    }
                }
            })
            .buffer_unordered(fetch.max_concurrent.max(1))
            .collect()
            .await;

    // buffer_unordered scrambles completion order; restore input order so
    // downstream output is deterministic.
    results.sort_by_key(|(idx, _, _)| *idx);

    let mut quotes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (_, quote, failure) in results {
        quotes.push(quote);
        failures.extend(failure);
    }

    QuoteBatch { quotes, failures }
}

fn fallback_quote(cache: &QuoteCache, ticker: &str) -> TickerQuote {
    match cache.last_known(ticker) {
        Some(price) => TickerQuote {
            ticker: ticker.to_string(),
            price: Some(price),
            stale: true,
        },
        None => TickerQuote {
            ticker: ticker.to_string(),
            price: None,
            stale: false,
        },
    }
}

/// Fetch trailing close history for several tickers with the same bounded
/// pool and per-ticker timeout. Failed tickers are simply absent from the
/// result map; the caller treats them as having no momentum signal.
pub async fn fetch_histories(
    provider: &dyn MarketDataProvider,
    fetch: &FetchConfig,
    tickers: &[String],
    days: u32,
) -> HashMap<String, Vec<PricePoint>> {
    let timeout = Duration::from_secs(fetch.timeout_secs);

    let results: Vec<Option<(String, Vec<PricePoint>)>> = stream::iter(tickers.to_vec())
        .map(|ticker| async move {
            match tokio::time::timeout(timeout, provider.history(&ticker, days)).await {
                Ok(Ok(series)) => Some((ticker, series)),
                Ok(Err(e)) => {
                    warn!("history fetch for {} failed: {}", ticker, e);
                    None
                }
                Err(_) => {
                    warn!("history fetch for {} timed out", ticker);
                    None
                }
            }
        })
        .buffer_unordered(fetch.max_concurrent.max(1))
        .collect()
        .await;

    results.into_iter().flatten().collect()
}
