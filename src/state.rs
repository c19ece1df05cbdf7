use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::external::market_provider::MarketDataProvider;
use crate::external::prediction::PredictionProvider;
use crate::services::quote_cache::QuoteCache;
use crate::store::{HoldingsStore, ProposalStore, SnapshotStore};

#[derive(Clone)]
pub struct AppState {
    pub holdings: Arc<dyn HoldingsStore>,
    pub market: Arc<dyn MarketDataProvider>,
    pub predictions: Arc<dyn PredictionProvider>,
    pub quote_cache: QuoteCache,
    pub snapshots: Arc<SnapshotStore>,
    pub proposals: Arc<ProposalStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<EngineConfig>,
}
