use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Insights;
use crate::services::{analytics_service, insight_service, trigger_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:portfolio_id", get(get_insights))
}

/// GET /api/insights/:portfolio_id
///
/// Combined summary: analytics, rebalance check, and recommendations from
/// the latest pending proposal when one exists.
pub async fn get_insights(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Insights>, AppError> {
    info!("GET /api/insights/{}", portfolio_id);

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

    let check = trigger_service::check_rebalance(&analytics, &state.config.policy);

    let pending = state
        .proposals
        .latest_pending(portfolio_id, state.clock.now());
    let insights = insight_service::build_insights(
        &analytics,
        &check,
        pending.as_ref().map(|p| p.actions.as_slice()),
    );

    Ok(Json(insights))
}
