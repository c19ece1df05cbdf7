//! Shared fixtures: deterministic providers and a fully wired engine state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use stockpilot_backend::clock::ManualClock;
use stockpilot_backend::config::EngineConfig;
use stockpilot_backend::external::market_provider::{MarketDataProvider, ProviderError};
use stockpilot_backend::external::prediction::{Prediction, PredictionProvider};
use stockpilot_backend::models::{Holding, PricePoint};
use stockpilot_backend::services::quote_cache::QuoteCache;
use stockpilot_backend::state::AppState;
use stockpilot_backend::store::{InMemoryHoldingsStore, ProposalStore, SnapshotStore};

/// Market data provider backed by fixed maps. Tickers in `failing` error on
/// every call, tickers in `rate_limited` fail with the rate-limit fault;
/// everything else resolves instantly.
#[derive(Default)]
pub struct StubMarketProvider {
    pub quotes: HashMap<String, f64>,
    pub histories: HashMap<String, Vec<PricePoint>>,
    pub benchmark: Vec<PricePoint>,
    pub failing: HashSet<String>,
    pub rate_limited: HashSet<String>,
}

impl StubMarketProvider {
    pub fn with_quotes(quotes: &[(&str, f64)]) -> Self {
        Self {
            quotes: quotes
                .iter()
                .map(|(t, p)| (t.to_string(), *p))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_for(mut self, ticker: &str) -> Self {
        self.failing.insert(ticker.to_string());
        self
    }

    pub fn rate_limited_for(mut self, ticker: &str) -> Self {
        self.rate_limited.insert(ticker.to_string());
        self
    }
}

#[async_trait]
impl MarketDataProvider for StubMarketProvider {
    async fn quote(&self, ticker: &str) -> Result<f64, ProviderError> {
        if self.rate_limited.contains(ticker) {
            return Err(ProviderError::RateLimited);
        }
        if self.failing.contains(ticker) {
            return Err(ProviderError::Network(format!("{} unreachable", ticker)));
        }
        self.quotes
            .get(ticker)
            .copied()
            .ok_or_else(|| ProviderError::BadResponse(format!("unknown ticker {}", ticker)))
    }

    async fn history(&self, ticker: &str, _days: u32) -> Result<Vec<PricePoint>, ProviderError> {
        if self.failing.contains(ticker) {
            return Err(ProviderError::Network(format!("{} unreachable", ticker)));
        }
        self.histories
            .get(ticker)
            .cloned()
            .ok_or_else(|| ProviderError::BadResponse(format!("no history for {}", ticker)))
    }

    async fn benchmark(&self, _days: u32) -> Result<Vec<PricePoint>, ProviderError> {
        Ok(self.benchmark.clone())
    }
}

/// Prediction provider with fixed (change %, confidence) pairs; unknown
/// tickers score neutral.
#[derive(Default)]
pub struct StubPredictionProvider {
    pub predictions: HashMap<String, (f64, f64)>,
}

#[async_trait]
impl PredictionProvider for StubPredictionProvider {
    async fn predict(&self, ticker: &str) -> Result<Prediction, ProviderError> {
        match self.predictions.get(ticker) {
            Some((change_percent, confidence)) => Ok(Prediction {
                ticker: ticker.to_string(),
                change_percent: *change_percent,
                confidence: *confidence,
            }),
            None => Ok(Prediction::neutral(ticker)),
        }
    }
}

pub fn holding(ticker: &str, quantity: f64, avg_price: f64, sector: &str) -> Holding {
    Holding {
        ticker: ticker.to_string(),
        quantity,
        avg_price,
        market: "US".to_string(),
        sector: Some(sector.to_string()),
        country: Some("US".to_string()),
    }
}

pub fn flat_series(days: u32, close: f64) -> Vec<PricePoint> {
    (0..days)
        .map(|i| PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
            close,
        })
        .collect()
}

/// Engine wired against stub providers with a manually advanced clock.
pub struct TestHarness {
    pub holdings: Arc<InMemoryHoldingsStore>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

pub fn harness(market: StubMarketProvider, predictions: StubPredictionProvider) -> TestHarness {
    let config = EngineConfig::default();
    let holdings = Arc::new(InMemoryHoldingsStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    ));

    let state = AppState {
        holdings: holdings.clone(),
        market: Arc::new(market),
        predictions: Arc::new(predictions),
        quote_cache: QuoteCache::new(),
        snapshots: Arc::new(SnapshotStore::new(config.snapshot_dedup_secs)),
        proposals: Arc::new(ProposalStore::new(config.proposal.ttl_hours)),
        clock: clock.clone(),
        config: Arc::new(config),
    };

    TestHarness {
        holdings,
        clock,
        state,
    }
}
