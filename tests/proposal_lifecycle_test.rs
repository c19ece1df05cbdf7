//! Proposal lifecycle: idempotency while pending, TTL expiry, accept/reject,
//! the dead-zone around tiny trades, and snapshot write dedup.

mod common;

use std::collections::HashMap;

use common::*;
use uuid::Uuid;

use stockpilot_backend::clock::Clock;
use stockpilot_backend::errors::AppError;
use stockpilot_backend::models::{
    ProposalDecision, ProposalStatus, ProposalType, RebalanceProposal, TradeAction,
};
use stockpilot_backend::services::{
    analytics_service, metrics_service, proposal_service, trigger_service,
};

fn concentrated_harness() -> (TestHarness, Uuid) {
    let market = StubMarketProvider::with_quotes(&[("TSLA", 100.0), ("JNJ", 100.0)]);
    let h = harness(market, StubPredictionProvider::default());
    let id = Uuid::new_v4();
    h.holdings.seed(
        id,
        vec![
            holding("TSLA", 90.0, 80.0, "Automotive"),
            holding("JNJ", 10.0, 80.0, "Healthcare"),
        ],
    );
    (h, id)
}

async fn propose(h: &TestHarness, id: Uuid) -> Result<Option<RebalanceProposal>, AppError> {
    proposal_service::generate_proposal(
        h.state.holdings.as_ref(),
        h.state.market.as_ref(),
        h.state.predictions.as_ref(),
        &h.state.quote_cache,
        &h.state.snapshots,
        &h.state.proposals,
        &h.state.config,
        h.state.clock.as_ref(),
        id,
        ProposalType::RiskReduction,
    )
    .await
}

#[tokio::test]
async fn test_propose_is_idempotent_while_pending() {
    let (h, id) = concentrated_harness();

    let first = propose(&h, id).await.unwrap().expect("proposal");
    let second = propose(&h, id).await.unwrap().expect("proposal");

    assert_eq!(first.id, second.id);
    assert_eq!(h.state.proposals.latest_pending(id, h.clock.now()).unwrap().id, first.id);
}

#[tokio::test]
async fn test_pending_proposal_expires_after_ttl() {
    let (h, id) = concentrated_harness();

    let first = propose(&h, id).await.unwrap().expect("proposal");

    h.clock
        .advance(chrono::Duration::hours(h.state.config.proposal.ttl_hours + 1));
    assert!(h.state.proposals.latest_pending(id, h.clock.now()).is_none());

    // Conditions still hold, so a fresh proposal replaces the expired one.
    let second = propose(&h, id).await.unwrap().expect("proposal");
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, ProposalStatus::Pending);
}

#[tokio::test]
async fn test_accepting_a_proposal_records_execution_time() {
    let (h, id) = concentrated_harness();
    let proposal = propose(&h, id).await.unwrap().expect("proposal");

    let now = h.clock.now();
    let accepted = h
        .state
        .proposals
        .decide(id, proposal.id, ProposalDecision::Accepted, now)
        .unwrap();

    assert_eq!(accepted.status, ProposalStatus::Accepted);
    assert_eq!(accepted.executed_at, Some(now));

    // Accepted proposals no longer satisfy the idempotency check; proposing
    // again creates a new pending one.
    let next = propose(&h, id).await.unwrap().expect("proposal");
    assert_ne!(next.id, proposal.id);
}

#[tokio::test]
async fn test_rejected_proposal_cannot_be_decided_again() {
    let (h, id) = concentrated_harness();
    let proposal = propose(&h, id).await.unwrap().expect("proposal");

    h.state
        .proposals
        .decide(id, proposal.id, ProposalDecision::Rejected, h.clock.now())
        .unwrap();

    let again = h
        .state
        .proposals
        .decide(id, proposal.id, ProposalDecision::Accepted, h.clock.now());
    assert!(matches!(again, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_snapshot_writes_within_dedup_window_collapse() {
    let market = StubMarketProvider::with_quotes(&[("AAPL", 100.0)]);
    let h = harness(market, StubPredictionProvider::default());
    let id = Uuid::new_v4();
    h.holdings
        .seed(id, vec![holding("AAPL", 10.0, 90.0, "Technology")]);

    for _ in 0..3 {
        analytics_service::persist_snapshot(
            h.state.holdings.as_ref(),
            h.state.market.as_ref(),
            &h.state.quote_cache,
            &h.state.snapshots,
            &h.state.config,
            h.state.clock.as_ref(),
            id,
        )
        .await
        .unwrap();
    }

    // Same clock instant for all three writes: only one row is stored.
    assert_eq!(h.state.snapshots.history_len(id), 1);
}

#[tokio::test]
async fn test_tiny_imbalances_land_in_the_hold_dead_zone() {
    // Two equal positions with identical signals: targets equal current, so
    // every trade falls under the minimum and becomes a Hold.
    let h = harness(
        StubMarketProvider::default(),
        StubPredictionProvider::default(),
    );
    let holdings = vec![
        holding("AAPL", 10.0, 90.0, "Technology"),
        holding("JNJ", 10.0, 90.0, "Healthcare"),
    ];
    let quotes: Vec<_> = ["AAPL", "JNJ"]
        .iter()
        .map(|t| stockpilot_backend::models::TickerQuote {
            ticker: t.to_string(),
            price: Some(100.0),
            stale: false,
        })
        .collect();

    let input = metrics_service::MetricsInput {
        holdings: &holdings,
        quotes: &quotes,
        value_history: &[],
        benchmark_closes: &[],
        risk_free_rate: h.state.config.risk_free_rate,
    };
    let id = Uuid::new_v4();
    let analytics = metrics_service::compute_analytics(id, &input, h.clock.now()).unwrap();
    let check = trigger_service::check_rebalance(&analytics, &h.state.config.policy);

    let predictions: HashMap<String, stockpilot_backend::external::prediction::Prediction> =
        HashMap::new();
    let histories: HashMap<String, Vec<stockpilot_backend::models::PricePoint>> = HashMap::new();
    let inputs = proposal_service::ProposalInputs {
        analytics: &analytics,
        check: &check,
        holdings: &holdings,
        quotes: &quotes,
        predictions: &predictions,
        histories: &histories,
        value_history: &[],
        benchmark_closes: &[],
    };
    let proposal = proposal_service::build_proposal(
        &inputs,
        id,
        ProposalType::Drift,
        &h.state.config,
        h.clock.now(),
    )
    .unwrap();

    for action in &proposal.actions {
        assert_eq!(action.action, TradeAction::Hold);
        assert_eq!(action.amount, 0.0);
        assert_eq!(action.shares_diff, 0.0);
    }
}
