use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::AppError;
use crate::external::market_provider::MarketDataProvider;
use crate::models::{Holding, PortfolioAnalytics, PricePoint, TickerQuote};
use crate::services::quote_cache::QuoteCache;
use crate::services::{market_data_service, metrics_service};
use crate::store::{HoldingsStore, SnapshotStore};

/// Fully resolved inputs plus the computed analytics for one portfolio.
/// The proposal generator reuses the resolved holdings/quotes instead of
/// fetching twice.
pub struct PortfolioView {
    pub holdings: Vec<Holding>,
    pub quotes: Vec<TickerQuote>,
    pub benchmark: Vec<PricePoint>,
    pub analytics: PortfolioAnalytics,
}

/// Load holdings, resolve quotes through the bounded fetch pool, pull the
/// benchmark series, and run the metrics calculator.
pub async fn load_portfolio_view(
    holdings_store: &dyn HoldingsStore,
    market: &dyn MarketDataProvider,
    quote_cache: &QuoteCache,
    snapshots: &SnapshotStore,
    config: &EngineConfig,
    clock: &dyn Clock,
    portfolio_id: Uuid,
) -> Result<PortfolioView, AppError> {
    let holdings = holdings_store.fetch_holdings(portfolio_id).await?;
    if holdings.is_empty() {
        return Err(AppError::Validation(format!(
            "portfolio {} has no holdings to analyze",
            portfolio_id
        )));
    }

    let tickers: Vec<String> = holdings.iter().map(|h| h.ticker.clone()).collect();
    let batch =
        market_data_service::fetch_quotes(market, quote_cache, &config.fetch, &tickers).await;
    // Every ticker failing with nothing cached is an upstream outage, not a
    // missing portfolio; report the provider fault instead of computing.
    if let Some(err) = batch.outage_error() {
        warn!(
            "no quote resolved for portfolio {}: reporting provider fault",
            portfolio_id
        );
        return Err(err);
    }
    let quotes = batch.quotes;

    // A missing benchmark only costs beta/alpha, never the whole request.
    let window = snapshots.history_len(portfolio_id).max(30) as u32;
    let benchmark = match market.benchmark(window).await {
        Ok(series) => series,
        Err(e) => {
            warn!("benchmark fetch failed, beta/alpha will be null: {}", e);
            Vec::new()
        }
    };

    let value_history = snapshots.value_history(portfolio_id);
    let input = metrics_service::MetricsInput {
        holdings: &holdings,
        quotes: &quotes,
        value_history: &value_history,
        benchmark_closes: &benchmark,
        risk_free_rate: config.risk_free_rate,
    };
    let analytics = metrics_service::compute_analytics(portfolio_id, &input, clock.now())?;

    Ok(PortfolioView {
        holdings,
        quotes,
        benchmark,
        analytics,
    })
}

/// Compute analytics on demand without persisting anything.
pub async fn compute_portfolio_analytics(
    holdings_store: &dyn HoldingsStore,
    market: &dyn MarketDataProvider,
    quote_cache: &QuoteCache,
    snapshots: &SnapshotStore,
    config: &EngineConfig,
    clock: &dyn Clock,
    portfolio_id: Uuid,
) -> Result<PortfolioAnalytics, AppError> {
    let view = load_portfolio_view(
        holdings_store,
        market,
        quote_cache,
        snapshots,
        config,
        clock,
        portfolio_id,
    )
    .await?;
    Ok(view.analytics)
}

/// Compute analytics and append the snapshot to the store. Concurrent
/// writes within the dedup window collapse into the stored row.
pub async fn persist_snapshot(
    holdings_store: &dyn HoldingsStore,
    market: &dyn MarketDataProvider,
    quote_cache: &QuoteCache,
    snapshots: &SnapshotStore,
    config: &EngineConfig,
    clock: &dyn Clock,
    portfolio_id: Uuid,
) -> Result<PortfolioAnalytics, AppError> {
    let analytics = compute_portfolio_analytics(
        holdings_store,
        market,
        quote_cache,
        snapshots,
        config,
        clock,
        portfolio_id,
    )
    .await?;

    let stored = snapshots.append(analytics)?;
    info!(
        "persisted analytics snapshot for portfolio {} (history depth {})",
        portfolio_id,
        snapshots.history_len(portfolio_id)
    );
    Ok(stored)
}
