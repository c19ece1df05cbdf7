use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::AppError;
use crate::external::market_provider::MarketDataProvider;
use crate::external::prediction::{Prediction, PredictionProvider};
use crate::models::{
    Holding, PortfolioAnalytics, PricePoint, ProposalStatus, ProposalType, RebalanceAction,
    RebalanceCheck, RebalanceProposal, TickerQuote, TradeAction,
};
use crate::services::quote_cache::QuoteCache;
use crate::services::{analytics_service, market_data_service, metrics_service};
use crate::store::{HoldingsStore, ProposalStore, SnapshotStore};

/// Everything the pure proposal builder consumes. Assembled by
/// `generate_proposal`; handed in directly by tests.
pub struct ProposalInputs<'a> {
    pub analytics: &'a PortfolioAnalytics,
    pub check: &'a RebalanceCheck,
    pub holdings: &'a [Holding],
    pub quotes: &'a [TickerQuote],
    pub predictions: &'a HashMap<String, Prediction>,
    pub histories: &'a HashMap<String, Vec<PricePoint>>,
    pub value_history: &'a [f64],
    pub benchmark_closes: &'a [PricePoint],
}

/// One candidate's signals and resulting blended score.
#[derive(Debug, Clone)]
struct CandidateSignal {
    ticker: String,
    price: f64,
    current_shares: f64,
    current_weight: f64,
    ai: f64,
    momentum: f64,
    diversification: f64,
    blended: f64,
}

/// Orchestrate a propose call end to end: load the portfolio, re-check the
/// triggers, honor idempotency against the proposal store, gather prediction
/// and momentum inputs, and build the proposal.
///
/// Returns `Ok(None)` when the portfolio does not need rebalancing.
#[allow(clippy::too_many_arguments)]
pub async fn generate_proposal(
    holdings_store: &dyn HoldingsStore,
    market: &dyn MarketDataProvider,
    predictions: &dyn PredictionProvider,
    quote_cache: &QuoteCache,
    snapshots: &SnapshotStore,
    proposals: &ProposalStore,
    config: &EngineConfig,
    clock: &dyn Clock,
    portfolio_id: Uuid,
    proposal_type: ProposalType,
) -> Result<Option<RebalanceProposal>, AppError> {
    let view = analytics_service::load_portfolio_view(
        holdings_store,
        market,
        quote_cache,
        snapshots,
        config,
        clock,
        portfolio_id,
    )
    .await?;

    let check = crate::services::trigger_service::check_rebalance(&view.analytics, &config.policy);
    if !check.needs_rebalancing {
        info!(
            "portfolio {} does not need rebalancing, no proposal generated",
            portfolio_id
        );
        return Ok(None);
    }

    let trigger_reason = trigger_reason(&check, &view.analytics);
    let now = clock.now();

    // A second propose call while a matching pending proposal exists returns
    // the existing one instead of creating a duplicate.
    if let Some(existing) = proposals.find_pending(portfolio_id, &trigger_reason, now) {
        info!(
            "returning existing pending proposal {} for portfolio {}",
            existing.id, portfolio_id
        );
        return Ok(Some(existing));
    }

    let universe: Vec<String> = view
        .quotes
        .iter()
        .filter(|q| q.price.is_some())
        .map(|q| q.ticker.clone())
        .collect();

    let prediction_map = fetch_predictions(predictions, config, &universe).await;
    let histories = market_data_service::fetch_histories(
        market,
        &config.fetch,
        &universe,
        config.momentum_window_days,
    )
    .await;

    let value_history = snapshots.value_history(portfolio_id);
    let inputs = ProposalInputs {
        analytics: &view.analytics,
        check: &check,
        holdings: &view.holdings,
        quotes: &view.quotes,
        predictions: &prediction_map,
        histories: &histories,
        value_history: &value_history,
        benchmark_closes: &view.benchmark,
    };

    let proposal = build_proposal(&inputs, portfolio_id, proposal_type, config, now)?;
    proposals.insert(proposal.clone());

    info!(
        "created proposal {} for portfolio {} ({} actions, severity {:.0})",
        proposal.id,
        portfolio_id,
        proposal.actions.len(),
        check.severity_score
    );

    Ok(Some(proposal))
}

/// Build a rebalance proposal from fully gathered inputs. Pure and
/// deterministic; all policy comes from `config`.
pub fn build_proposal(
    inputs: &ProposalInputs<'_>,
    portfolio_id: Uuid,
    proposal_type: ProposalType,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<RebalanceProposal, AppError> {
    let signals = candidate_signals(inputs, config);
    if signals.is_empty() {
        return Err(AppError::Validation(
            "cannot generate a proposal: the candidate universe is empty (no ticker has a usable price)"
                .to_string(),
        ));
    }

    let blended: Vec<f64> = signals.iter().map(|s| s.blended).collect();
    let target_weights = bounded_target_weights(
        &blended,
        config.proposal.softmax_temperature,
        config.proposal.weight_floor_pct,
        config.proposal.weight_cap_pct,
    );

    let total_value = inputs.analytics.performance.total_value;
    let weights = &config.weights;

    let mut actions = Vec::with_capacity(signals.len());
    for (signal, &target_weight) in signals.iter().zip(target_weights.iter()) {
        let mut target_shares = (target_weight / 100.0 * total_value / signal.price).floor();
        let mut shares_diff = target_shares - signal.current_shares;
        let mut amount = shares_diff * signal.price;

        let action;
        let reason;
        if amount.abs() < config.proposal.min_trade_amount {
            // Dead-zone: don't propose trivial trades.
            action = TradeAction::Hold;
            shares_diff = 0.0;
            target_shares = signal.current_shares;
            amount = 0.0;
            reason = format!(
                "Trade below the ${:.0} minimum, holding position",
                config.proposal.min_trade_amount
            );
        } else {
            action = if shares_diff > 0.0 {
                TradeAction::Increase
            } else {
                TradeAction::Reduce
            };
            reason = driver_reason(signal, weights, action);
        }

        actions.push(RebalanceAction {
            ticker: signal.ticker.clone(),
            action,
            current_weight: signal.current_weight,
            target_weight,
            current_shares: signal.current_shares,
            target_shares,
            shares_diff,
            current_price: signal.price,
            amount,
            reason,
        });
    }

    let simulated = simulate_target_portfolio(inputs, &actions)?;

    let current_risk_score = portfolio_risk_score(inputs.analytics);
    let target_risk_score = portfolio_risk_score(&simulated);
    let current_diversification_score =
        metrics_service::diversification_score(&inputs.analytics.diversification);
    let target_diversification_score =
        metrics_service::diversification_score(&simulated.diversification);

    let expected_return_change = signals
        .iter()
        .zip(target_weights.iter())
        .map(|(s, &tw)| (tw - s.current_weight) / 100.0 * s.ai)
        .sum();

    Ok(RebalanceProposal {
        id: Uuid::new_v4(),
        portfolio_id,
        proposal_type,
        trigger_reason: trigger_reason(inputs.check, inputs.analytics),
        current_risk_score,
        target_risk_score,
        current_diversification_score,
        target_diversification_score,
        actions,
        expected_return_change,
        expected_risk_change: target_risk_score - current_risk_score,
        status: ProposalStatus::Pending,
        created_at: now,
        executed_at: None,
    })
}

fn trigger_reason(check: &RebalanceCheck, analytics: &PortfolioAnalytics) -> String {
    let mut reason = check.triggers.join("; ");
    if !analytics.excluded_tickers.is_empty() {
        reason.push_str(&format!(
            " (excluded, no usable price: {})",
            analytics.excluded_tickers.join(", ")
        ));
    }
    reason
}

fn candidate_signals(inputs: &ProposalInputs<'_>, config: &EngineConfig) -> Vec<CandidateSignal> {
    let price_by_ticker: HashMap<&str, f64> = inputs
        .quotes
        .iter()
        .filter_map(|q| q.price.map(|p| (q.ticker.as_str(), p)))
        .filter(|(_, p)| p.is_finite() && *p > 0.0)
        .collect();

    let weights = &config.weights;
    let mut signals = Vec::new();

    for holding in inputs.holdings {
        let Some(&price) = price_by_ticker.get(holding.ticker.as_str()) else {
            continue;
        };

        let current_weight = inputs
            .analytics
            .holding_weights
            .get(&holding.ticker)
            .copied()
            .unwrap_or(0.0);

        let ai = inputs
            .predictions
            .get(&holding.ticker)
            .map(|p| p.change_percent / 100.0 * p.confidence)
            .unwrap_or(0.0);

        let momentum = inputs
            .histories
            .get(&holding.ticker)
            .map(|series| momentum_return(series))
            .unwrap_or(0.0);

        let sector_weight = inputs
            .analytics
            .diversification
            .sector_distribution
            .get(holding.sector_label())
            .copied()
            .unwrap_or(0.0);
        let diversification = (100.0 - sector_weight) / 100.0;

        let blended = weights.ai * ai
            + weights.momentum * momentum
            + weights.diversification * diversification;

        signals.push(CandidateSignal {
            ticker: holding.ticker.clone(),
            price,
            current_shares: holding.quantity,
            current_weight,
            ai,
            momentum,
            diversification,
            blended,
        });
    }

    signals
}

/// Total return over the trailing history window, clamped so one runaway
/// ticker cannot dominate the blend.
fn momentum_return(series: &[PricePoint]) -> f64 {
    let first = series.iter().map(|p| p.close).find(|c| *c > 0.0);
    let last = series.last().map(|p| p.close);
    match (first, last) {
        (Some(first), Some(last)) if first > 0.0 => ((last - first) / first).clamp(-0.5, 0.5),
        _ => 0.0,
    }
}

/// Turn blended scores into target weights that sum to 100%.
///
/// Softmax over the scores (temperature-scaled), then clip into
/// [floor, cap] and redistribute until the sum converges back to 100. An
/// infeasible cap (cap × n < 100) relaxes to the equal-weight share.
pub fn bounded_target_weights(
    blended: &[f64],
    temperature: f64,
    floor_pct: f64,
    cap_pct: f64,
) -> Vec<f64> {
    let n = blended.len();
    if n == 0 {
        return Vec::new();
    }
    let equal = 100.0 / n as f64;
    if n == 1 {
        return vec![100.0];
    }

    let cap = if cap_pct * (n as f64) < 100.0 {
        equal
    } else {
        cap_pct
    };
    let floor = if floor_pct * (n as f64) > 100.0 {
        equal
    } else {
        floor_pct.max(0.0)
    };

    let t = temperature.max(1e-6);
    let z_max = blended.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = blended.iter().map(|z| ((z - z_max) / t).exp()).collect();
    let sum: f64 = exps.iter().sum();
    let mut weights: Vec<f64> = exps.iter().map(|e| e / sum * 100.0).collect();

    for _ in 0..64 {
        for w in weights.iter_mut() {
            *w = w.clamp(floor, cap);
        }
        let total: f64 = weights.iter().sum();
        let deficit = 100.0 - total;
        if deficit.abs() < 1e-7 {
            break;
        }

        let adjustable: Vec<usize> = weights
            .iter()
            .enumerate()
            .filter(|(_, w)| {
                if deficit > 0.0 {
                    **w < cap - 1e-9
                } else {
                    **w > floor + 1e-9
                }
            })
            .map(|(i, _)| i)
            .collect();
        if adjustable.is_empty() {
            break;
        }

        let share = deficit / adjustable.len() as f64;
        for i in adjustable {
            weights[i] += share;
        }
    }

    weights
}

fn driver_reason(signal: &CandidateSignal, weights: &crate::config::ScoreWeights, action: TradeAction) -> String {
    let contributions = [
        ("AI forecast", weights.ai * signal.ai),
        ("momentum", weights.momentum * signal.momentum),
        (
            "sector diversification",
            weights.diversification * signal.diversification,
        ),
    ];
    let dominant = contributions
        .iter()
        .max_by(|a, b| {
            a.1.abs()
                .partial_cmp(&b.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(name, _)| *name)
        .unwrap_or("AI forecast");

    let verb = match action {
        TradeAction::Increase => "Increase",
        TradeAction::Reduce => "Reduce",
        TradeAction::Hold => "Hold",
    };

    format!("{} driven primarily by {}", verb, dominant)
}

/// Re-run the metrics calculator against the post-rebalance composition to
/// report what the proposal would do to risk and diversification.
fn simulate_target_portfolio(
    inputs: &ProposalInputs<'_>,
    actions: &[RebalanceAction],
) -> Result<PortfolioAnalytics, AppError> {
    let shares_by_ticker: HashMap<&str, f64> = actions
        .iter()
        .map(|a| (a.ticker.as_str(), a.target_shares))
        .collect();

    let simulated_holdings: Vec<Holding> = inputs
        .holdings
        .iter()
        .filter_map(|h| {
            let target = shares_by_ticker.get(h.ticker.as_str()).copied()?;
            if target <= 0.0 {
                return None;
            }
            let mut clone = h.clone();
            clone.quantity = target;
            Some(clone)
        })
        .collect();

    if simulated_holdings.is_empty() {
        return Err(AppError::Validation(
            "proposal simulation left no positions".to_string(),
        ));
    }

    let input = metrics_service::MetricsInput {
        holdings: &simulated_holdings,
        quotes: inputs.quotes,
        value_history: inputs.value_history,
        benchmark_closes: inputs.benchmark_closes,
        risk_free_rate: 0.0,
    };
    metrics_service::compute_analytics(
        inputs.analytics.portfolio_id,
        &input,
        inputs.analytics.snapshot_date,
    )
}

/// Risk score used on proposals: history-derived risk blended with a
/// Herfindahl concentration term so composition changes move the number.
pub fn portfolio_risk_score(analytics: &PortfolioAnalytics) -> f64 {
    let history_risk =
        metrics_service::risk_score(&analytics.risk, analytics.performance.total_value);
    let hhi = herfindahl_index(analytics.holding_weights.values().copied());

    (0.6 * history_risk + 0.4 * hhi).clamp(0.0, 100.0)
}

/// Herfindahl index over weight percentages, scaled to 0-100.
fn herfindahl_index(weights: impl Iterator<Item = f64>) -> f64 {
    weights.map(|w| (w / 100.0).powi(2)).sum::<f64>() * 100.0
}

async fn fetch_predictions(
    provider: &dyn PredictionProvider,
    config: &EngineConfig,
    tickers: &[String],
) -> HashMap<String, Prediction> {
    let timeout = Duration::from_secs(config.fetch.timeout_secs);

    // Owned tickers: handler futures must not capture the borrow lifetime.
    let results: Vec<Prediction> = stream::iter(tickers.to_vec())
        .map(|ticker| async move {
            match tokio::time::timeout(timeout, provider.predict(&ticker)).await {
                Ok(Ok(prediction)) => prediction,
                Ok(Err(e)) => {
                    warn!("prediction for {} failed, using neutral: {}", ticker, e);
                    Prediction::neutral(&ticker)
                }
                Err(_) => {
                    warn!("prediction for {} timed out, using neutral", ticker);
                    Prediction::neutral(&ticker)
                }
            }
        })
        .buffer_unordered(config.fetch.max_concurrent.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .map(|p| (p.ticker.clone(), p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_weights_sum_to_100() {
        let weights = bounded_target_weights(&[0.5, 0.1, -0.2, 0.3], 0.25, 0.0, 30.0);

        let sum: f64 = weights.iter().sum();
        assert!((sum - 100.0).abs() < 0.1);
        assert!(weights.iter().all(|w| *w <= 30.0 + 1e-6 && *w >= 0.0));
    }

    #[test]
    fn test_cap_limits_best_scorer() {
        // One runaway score would take nearly everything without the cap.
        let weights = bounded_target_weights(&[5.0, 0.0, 0.0, 0.0, 0.0], 0.25, 0.0, 30.0);

        assert!(weights[0] <= 30.0 + 1e-6);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_infeasible_cap_relaxes_to_equal_weight() {
        // cap 30% x 3 candidates = 90% < 100%: cap must relax.
        let weights = bounded_target_weights(&[0.1, 0.2, 0.3], 0.25, 0.0, 30.0);

        let sum: f64 = weights.iter().sum();
        assert!((sum - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_single_candidate_gets_everything() {
        let weights = bounded_target_weights(&[0.4], 0.25, 0.0, 30.0);
        assert_eq!(weights, vec![100.0]);
    }

    #[test]
    fn test_higher_score_never_gets_less_weight() {
        let weights = bounded_target_weights(&[0.9, 0.5, 0.1, -0.3, -0.7], 0.25, 0.0, 40.0);

        for pair in weights.windows(2) {
            assert!(pair[0] >= pair[1] - 1e-9);
        }
    }

    #[test]
    fn test_herfindahl_index_extremes() {
        let concentrated = herfindahl_index([100.0].into_iter());
        assert!((concentrated - 100.0).abs() < 1e-9);

        let spread = herfindahl_index([25.0, 25.0, 25.0, 25.0].into_iter());
        assert!((spread - 25.0).abs() < 1e-9);
        assert!(spread < concentrated);
    }

    #[test]
    fn test_momentum_return_clamped() {
        use chrono::NaiveDate;
        let series: Vec<PricePoint> = (0u32..10)
            .map(|i| PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1 + i).unwrap(),
                close: 100.0 * (1.0 + i as f64), // 10x runaway
            })
            .collect();

        assert_eq!(momentum_return(&series), 0.5);
        assert_eq!(momentum_return(&[]), 0.0);
    }
}
