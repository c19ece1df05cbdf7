use std::sync::Arc;

use dashmap::DashMap;

/// Thread-safe cache of the last good price per ticker.
///
/// When a fetch times out or fails, the engine serves the cached price marked
/// stale instead of failing the whole analytics request.
#[derive(Clone, Default)]
pub struct QuoteCache {
    cache: Arc<DashMap<String, f64>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, ticker: &str, price: f64) {
        self.cache.insert(ticker.to_string(), price);
    }

    pub fn last_known(&self, ticker: &str) -> Option<f64> {
        self.cache.get(ticker).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read_back() {
        let cache = QuoteCache::new();

        cache.record("AAPL", 187.5);

        assert_eq!(cache.last_known("AAPL"), Some(187.5));
    }

    #[test]
    fn test_missing_ticker_is_none() {
        let cache = QuoteCache::new();
        assert!(cache.last_known("MSFT").is_none());
    }

    #[test]
    fn test_record_overwrites() {
        let cache = QuoteCache::new();

        cache.record("AAPL", 180.0);
        cache.record("AAPL", 185.0);

        assert_eq!(cache.last_known("AAPL"), Some(185.0));
        assert_eq!(cache.len(), 1);
    }
}
