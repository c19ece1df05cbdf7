use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::PortfolioAnalytics;
use crate::services::analytics_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:portfolio_id", get(get_analytics))
        .route("/:portfolio_id/snapshot", post(create_snapshot))
}

/// GET /api/analytics/:portfolio_id
///
/// Compute a fresh analytics snapshot for the portfolio without persisting.
pub async fn get_analytics(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioAnalytics>, AppError> {
    info!("GET /api/analytics/{} - computing analytics", portfolio_id);

    let analytics = analytics_service::compute_portfolio_analytics(
        state.holdings.as_ref(),
        state.market.as_ref(),
        &state.quote_cache,
        &state.snapshots,
        &state.config,
        state.clock.as_ref(),
        portfolio_id,
    )
    .await?;

    Ok(Json(analytics))
}

/// POST /api/analytics/:portfolio_id/snapshot
///
/// Compute analytics and append the snapshot to the stored history.
pub async fn create_snapshot(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioAnalytics>, AppError> {
    info!(
        "POST /api/analytics/{}/snapshot - persisting snapshot",
        portfolio_id
    );

    let stored = analytics_service::persist_snapshot(
        state.holdings.as_ref(),
        state.market.as_ref(),
        &state.quote_cache,
        &state.snapshots,
        &state.config,
        state.clock.as_ref(),
        portfolio_id,
    )
    .await?;

    Ok(Json(stored))
}
