use crate::models::{
    Insights, InsightSummary, PortfolioAnalytics, RebalanceAction, RebalanceCheck, Severity,
    TradeAction,
};
use crate::services::metrics_service;

// Composite weighting: urgency (inverted severity) 40%, diversification 30%,
// risk-adjusted return 30%.
const SEVERITY_WEIGHT: f64 = 0.4;
const DIVERSIFICATION_WEIGHT: f64 = 0.3;
const RISK_ADJUSTED_WEIGHT: f64 = 0.3;

// Bucketing thresholds for strengths and warnings.
const GOOD_DIVERSITY: f64 = 70.0;
const GOOD_SHARPE: f64 = 1.0;
const GOOD_CONCENTRATION: f64 = 40.0;
const BAD_CONCENTRATION: f64 = 60.0;
const BAD_VOLATILITY: f64 = 0.30;
const BAD_DRAWDOWN: f64 = -20.0;

/// Roll analytics, triggers, and the latest pending proposal into one
/// display-ready summary. Pure transform; recomputed per request.
pub fn build_insights(
    analytics: &PortfolioAnalytics,
    check: &RebalanceCheck,
    pending_actions: Option<&[RebalanceAction]>,
) -> Insights {
    let diversification_avg = metrics_service::diversification_score(&analytics.diversification);

    // Sharpe clamped into [0, 2] maps to 0-100; unknown scores neutral.
    let risk_adjusted = analytics
        .risk
        .sharpe_ratio
        .map(|s| s.clamp(0.0, 2.0) / 2.0 * 100.0)
        .unwrap_or(50.0);

    let overall_score = (SEVERITY_WEIGHT * (100.0 - check.severity_score)
        + DIVERSIFICATION_WEIGHT * diversification_avg
        + RISK_ADJUSTED_WEIGHT * risk_adjusted)
        .clamp(0.0, 100.0);

    let mut strengths = Vec::new();
    let mut warnings = Vec::new();

    if analytics.diversification.sector_diversity_score >= GOOD_DIVERSITY {
        strengths.push("Value is spread evenly across sectors".to_string());
    }
    if analytics.diversification.geographic_diversity_score >= GOOD_DIVERSITY {
        strengths.push("Geographic exposure is well diversified".to_string());
    }
    if let Some(sharpe) = analytics.risk.sharpe_ratio {
        if sharpe >= GOOD_SHARPE {
            strengths.push(format!(
                "Strong risk-adjusted returns (Sharpe {:.2})",
                sharpe
            ));
        }
    }
    if analytics.diversification.concentration_risk <= GOOD_CONCENTRATION {
        strengths.push("No position dominates the portfolio".to_string());
    }

    if analytics.diversification.concentration_risk > BAD_CONCENTRATION {
        warnings.push(format!(
            "Top positions hold {:.0}% of portfolio value",
            analytics.diversification.concentration_risk
        ));
    }
    if let Some(volatility) = analytics.risk.volatility {
        if volatility > BAD_VOLATILITY {
            warnings.push(format!(
                "Annualized volatility is elevated at {:.0}%",
                volatility * 100.0
            ));
        }
    }
    if let Some(drawdown) = analytics.risk.max_drawdown {
        if drawdown < BAD_DRAWDOWN {
            warnings.push(format!(
                "Portfolio has drawn down {:.0}% from its peak",
                -drawdown
            ));
        }
    }
    if !analytics.stale_tickers.is_empty() {
        warnings.push(format!(
            "Prices for {} served from cache and may be stale",
            analytics.stale_tickers.join(", ")
        ));
    }

    let recommendations = top_recommendations(pending_actions);
    let mut suggestions: Vec<String> = recommendations
        .iter()
        .map(|action| {
            let verb = match action.action {
                TradeAction::Increase => "Buy",
                TradeAction::Reduce => "Sell",
                TradeAction::Hold => "Hold",
            };
            format!(
                "{} {:.0} shares of {} (~${:.0})",
                verb,
                action.shares_diff.abs(),
                action.ticker,
                action.amount.abs()
            )
        })
        .collect();
    if suggestions.is_empty() {
        // No pending proposal: fall back to the fired triggers.
        suggestions = check
            .triggers
            .iter()
            .map(|t| format!("Review: {}", t))
            .collect();
    }
    if suggestions.is_empty() && check.severity == Severity::None {
        suggestions.push("Portfolio is within policy; no action needed".to_string());
    }

    Insights {
        overall_score,
        summary: InsightSummary {
            strengths,
            warnings,
            suggestions,
        },
        analytics: analytics.clone(),
        recommendations,
        rebalance_check: check.clone(),
    }
}

/// Top three non-Hold actions by absolute dollar impact.
fn top_recommendations(pending_actions: Option<&[RebalanceAction]>) -> Vec<RebalanceAction> {
    let Some(actions) = pending_actions else {
        return Vec::new();
    };

    let mut trades: Vec<RebalanceAction> = actions
        .iter()
        .filter(|a| a.action != TradeAction::Hold)
        .cloned()
        .collect();
    trades.sort_by(|a, b| {
        b.amount
            .abs()
            .partial_cmp(&a.amount.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    trades.truncate(3);
    trades
}
