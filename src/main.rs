use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use uuid::Uuid;

use stockpilot_backend::app;
use stockpilot_backend::clock::SystemClock;
use stockpilot_backend::config::EngineConfig;
use stockpilot_backend::external::http_market::HttpMarketDataProvider;
use stockpilot_backend::external::http_prediction::HttpPredictionProvider;
use stockpilot_backend::external::prediction::{NeutralPredictionProvider, PredictionProvider};
use stockpilot_backend::logging::{init_logging, LoggingConfig};
use stockpilot_backend::models::Holding;
use stockpilot_backend::services::quote_cache::QuoteCache;
use stockpilot_backend::state::AppState;
use stockpilot_backend::store::{InMemoryHoldingsStore, ProposalStore, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let config = EngineConfig::from_env();

    let market = Arc::new(
        HttpMarketDataProvider::from_env(&config.benchmark)
            .expect("Failed to create market data provider (check MARKET_DATA_URL)"),
    );

    // Prediction provider selection (defaults to neutral signals).
    let provider_name =
        std::env::var("PREDICTION_PROVIDER").unwrap_or_else(|_| "neutral".to_string());
    let predictions: Arc<dyn PredictionProvider> = match provider_name.to_lowercase().as_str() {
        "http" => {
            tracing::info!("📊 Using prediction provider: HTTP service");
            Arc::new(
                HttpPredictionProvider::from_env()
                    .expect("Failed to create prediction provider (check PREDICTION_URL)"),
            )
        }
        "neutral" => {
            tracing::info!("📊 Using prediction provider: neutral (no AI signals)");
            Arc::new(NeutralPredictionProvider)
        }
        _ => {
            panic!(
                "Invalid PREDICTION_PROVIDER: {}. Must be 'http' or 'neutral'",
                provider_name
            );
        }
    };

    let holdings = Arc::new(InMemoryHoldingsStore::new());
    if let Ok(path) = std::env::var("HOLDINGS_FILE") {
        seed_holdings(&holdings, &path)?;
    }

    let state = AppState {
        holdings,
        market,
        predictions,
        quote_cache: QuoteCache::new(),
        snapshots: Arc::new(SnapshotStore::new(config.snapshot_dedup_secs)),
        proposals: Arc::new(ProposalStore::new(config.proposal.ttl_hours)),
        clock: Arc::new(SystemClock),
        config: Arc::new(config),
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 StockPilot analytics engine running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed portfolios from a JSON file mapping portfolio id to holdings.
fn seed_holdings(store: &InMemoryHoldingsStore, path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let portfolios: HashMap<Uuid, Vec<Holding>> = serde_json::from_str(&raw)?;

    for (portfolio_id, holdings) in portfolios {
        tracing::info!(
            "seeded portfolio {} with {} holdings",
            portfolio_id,
            holdings.len()
        );
        store.seed(portfolio_id, holdings);
    }

    Ok(())
}
