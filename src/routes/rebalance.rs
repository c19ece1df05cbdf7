use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ProposalDecision, ProposalType, RebalanceCheck, RebalanceProposal};
use crate::services::{analytics_service, proposal_service, trigger_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:portfolio_id/check", get(check_rebalance))
        .route("/:portfolio_id/propose", post(propose_rebalance))
        .route(
            "/:portfolio_id/proposals/:proposal_id/decision",
            post(decide_proposal),
        )
}

/// GET /api/rebalance/:portfolio_id/check
///
/// Evaluate the rebalance policy against fresh analytics.
pub async fn check_rebalance(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<RebalanceCheck>, AppError> {
    info!("GET /api/rebalance/{}/check", portfolio_id);

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
    Ok(Json(check))
}

#[derive(Debug, Deserialize)]
pub struct ProposeRequest {
    pub proposal_type: ProposalType,
}

/// POST /api/rebalance/:portfolio_id/propose
///
/// Generate a rebalance proposal. Responds with `null` when trigger
/// conditions do not call for one; repeated calls while a matching pending
/// proposal exists return that proposal.
pub async fn propose_rebalance(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ProposeRequest>,
) -> Result<Json<Option<RebalanceProposal>>, AppError> {
    info!(
        "POST /api/rebalance/{}/propose ({:?})",
        portfolio_id, body.proposal_type
    );

    let proposal = proposal_service::generate_proposal(
        state.holdings.as_ref(),
        state.market.as_ref(),
        state.predictions.as_ref(),
        &state.quote_cache,
        &state.snapshots,
        &state.proposals,
        &state.config,
        state.clock.as_ref(),
        portfolio_id,
        body.proposal_type,
    )
    .await?;

    Ok(Json(proposal))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ProposalDecision,
}

/// POST /api/rebalance/:portfolio_id/proposals/:proposal_id/decision
///
/// Accept or reject a pending proposal. Execution stays manual; this only
/// records the decision.
pub async fn decide_proposal(
    Path((portfolio_id, proposal_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<RebalanceProposal>, AppError> {
    info!(
        "POST /api/rebalance/{}/proposals/{}/decision ({:?})",
        portfolio_id, proposal_id, body.decision
    );

    let updated = state.proposals.decide(
        portfolio_id,
        proposal_id,
        body.decision,
        state.clock.now(),
    )?;

    Ok(Json(updated))
}
