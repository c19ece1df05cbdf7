use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    DiversificationMetrics, Holding, PerformanceMetrics, PortfolioAnalytics, PricePoint,
    RiskMetrics, TickerQuote,
};

const TRADING_DAYS: f64 = 252.0;

/// Everything the calculator needs, assembled by the orchestration layer.
/// The computation itself is pure: identical inputs produce bit-identical
/// analytics.
pub struct MetricsInput<'a> {
    pub holdings: &'a [Holding],
    pub quotes: &'a [TickerQuote],
    /// Stored portfolio value snapshots, oldest first.
    pub value_history: &'a [f64],
    /// Benchmark daily closes, ascending.
    pub benchmark_closes: &'a [PricePoint],
    /// Annual risk-free rate as a fraction.
    pub risk_free_rate: f64,
}

/// Compute a full analytics snapshot for a portfolio.
///
/// A ticker with no usable price is excluded from every weighted sum and
/// listed in `excluded_tickers`; a single bad ticker never aborts the batch.
/// Only a portfolio with no usable data at all is a hard failure.
pub fn compute_analytics(
    portfolio_id: Uuid,
    input: &MetricsInput<'_>,
    snapshot_date: DateTime<Utc>,
) -> Result<PortfolioAnalytics, AppError> {
    if input.holdings.is_empty() {
        return Err(AppError::Validation(format!(
            "portfolio {} has no holdings to analyze",
            portfolio_id
        )));
    }

    let mut price_by_ticker: BTreeMap<&str, (f64, bool)> = BTreeMap::new();
    for quote in input.quotes {
        if let Some(price) = quote.price {
            if price.is_finite() && price > 0.0 {
                price_by_ticker.insert(quote.ticker.as_str(), (price, quote.stale));
            }
        }
    }

    // Positions with a usable price; the rest are flagged and excluded.
    let mut positions: Vec<(&Holding, f64, f64)> = Vec::new(); // (holding, price, value)
    let mut stale_tickers = Vec::new();
    let mut excluded_tickers = Vec::new();

    for holding in input.holdings {
        match price_by_ticker.get(holding.ticker.as_str()) {
            Some((price, stale)) => {
                if *stale {
                    stale_tickers.push(holding.ticker.clone());
                }
                positions.push((holding, *price, holding.quantity * price));
            }
            None => excluded_tickers.push(holding.ticker.clone()),
        }
    }

    if positions.is_empty() {
        return Err(AppError::NotFound(format!(
            "no usable price data for portfolio {}",
            portfolio_id
        )));
    }

    let total_value: f64 = positions.iter().map(|(_, _, v)| v).sum();
    let total_cost: f64 = positions
        .iter()
        .map(|(h, _, _)| h.quantity * h.avg_price)
        .sum();
    let total_gain = total_value - total_cost;
    let total_return = if total_cost > 0.0 {
        Some(total_gain / total_cost)
    } else {
        None
    };

    let returns = daily_returns(input.value_history);
    let daily_return = returns.last().copied();
    let annualized_return = geometric_annualized(&returns);

    let volatility = annualized_volatility(&returns);
    let sharpe_ratio = match (annualized_return, volatility) {
        (Some(ann), Some(vol)) if vol > f64::EPSILON => Some((ann - input.risk_free_rate) / vol),
        _ => None,
    };
    let max_drawdown = max_drawdown_pct(input.value_history);

    let bench_closes: Vec<f64> = input.benchmark_closes.iter().map(|p| p.close).collect();
    let bench_returns = daily_returns(&bench_closes);
    let beta = compute_beta(&returns, &bench_returns);
    let alpha = match (beta, annualized_return, geometric_annualized(&bench_returns)) {
        (Some(b), Some(ann), Some(bench_ann)) => Some(ann - b * bench_ann),
        _ => None,
    };
    let var_95 = compute_var_95(&returns, total_value);

    let mut holding_weights = BTreeMap::new();
    let mut sector_distribution: BTreeMap<String, f64> = BTreeMap::new();
    let mut country_distribution: BTreeMap<String, f64> = BTreeMap::new();

    for (holding, _, value) in &positions {
        let weight = value / total_value * 100.0;
        holding_weights.insert(holding.ticker.clone(), weight);
        *sector_distribution
            .entry(holding.sector_label().to_string())
            .or_insert(0.0) += weight;
        *country_distribution
            .entry(holding.country_label().to_string())
            .or_insert(0.0) += weight;
    }

    let diversification = DiversificationMetrics {
        sector_diversity_score: entropy_score(&sector_distribution),
        geographic_diversity_score: entropy_score(&country_distribution),
        concentration_risk: concentration_risk(&holding_weights),
        sector_distribution,
        country_distribution,
    };

    Ok(PortfolioAnalytics {
        portfolio_id,
        performance: PerformanceMetrics {
            total_value,
            total_cost,
            total_return,
            total_gain,
            daily_return,
            annualized_return,
        },
        risk: RiskMetrics {
            volatility,
            sharpe_ratio,
            max_drawdown,
            beta,
            alpha,
            var_95,
        },
        diversification,
        holding_weights,
        stale_tickers,
        excluded_tickers,
        snapshot_date,
    })
}

/// Daily relative changes over an ordered value series. Non-positive
/// predecessors are skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Compound a daily-return series up to a 252-trading-day basis.
fn geometric_annualized(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }

    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    if growth <= 0.0 {
        return None;
    }

    Some(growth.powf(TRADING_DAYS / returns.len() as f64) - 1.0)
}

/// Annualized standard deviation of daily returns; needs at least 5 points.
fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    if returns.len() < 5 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() as f64 - 1.0);

    Some(variance.sqrt() * TRADING_DAYS.sqrt())
}

/// Maximum peak-to-trough decline across the value series, as a negative
/// percentage.
fn max_drawdown_pct(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let mut peak = values[0];
    let mut max_dd = 0.0;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    Some(max_dd * 100.0)
}

/// cov(portfolio, benchmark) / var(benchmark) over the aligned trailing
/// window of the two return series.
fn compute_beta(returns: &[f64], bench_returns: &[f64]) -> Option<f64> {
    let n = returns.len().min(bench_returns.len());
    if n < 2 {
        return None;
    }

    let r = &returns[returns.len() - n..];
    let b = &bench_returns[bench_returns.len() - n..];

    let mean_r = r.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_b = 0.0;
    for (ri, bi) in r.iter().zip(b.iter()) {
        cov += (ri - mean_r) * (bi - mean_b);
        var_b += (bi - mean_b).powi(2);
    }

    if var_b.abs() < f64::EPSILON {
        return None;
    }

    Some(cov / var_b)
}

/// 1-day 95% VaR in dollars.
///
/// Historical simulation when 20+ returns exist; a parametric normal
/// approximation covers shorter histories and is labeled as such in the
/// debug log. Below 5 returns the metric is undefined.
fn compute_var_95(returns: &[f64], total_value: f64) -> Option<f64> {
    if returns.len() < 5 {
        return None;
    }

    if returns.len() >= 20 {
        let mut sorted = returns.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = (sorted.len() as f64 * 0.05).floor() as usize;
        return Some(sorted[idx] * total_value);
    }

    // Short history: parametric normal approximation at the 5th percentile.
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let sd = variance.sqrt();
    debug!(
        "var_95 using parametric fallback ({} returns < 20)",
        returns.len()
    );

    Some((mean - 1.645 * sd) * total_value)
}

/// Normalized Shannon entropy of a weight distribution, rescaled to 0-100.
/// Natural log base; a single category scores 0.
fn entropy_score(distribution: &BTreeMap<String, f64>) -> f64 {
    let weights: Vec<f64> = distribution.values().copied().filter(|w| *w > 0.0).collect();
    let k = weights.len();
    if k <= 1 {
        return 0.0;
    }

    let total: f64 = weights.iter().sum();
    let entropy: f64 = weights
        .iter()
        .map(|w| {
            let p = w / total;
            -p * p.ln()
        })
        .sum();

    (entropy / (k as f64).ln() * 100.0).clamp(0.0, 100.0)
}

/// Combined weight of the 5 largest holdings (all of them when fewer).
fn concentration_risk(holding_weights: &BTreeMap<String, f64>) -> f64 {
    let mut weights: Vec<f64> = holding_weights.values().copied().collect();
    weights.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    weights.iter().take(5).sum()
}

/// Score risk metrics into a 0-100 rating; higher is riskier.
///
/// Weighting: 40% volatility (50% annualized as extreme), 30% drawdown
/// (-50% as extreme), 20% beta magnitude (2.0 as extreme), 10% VaR relative
/// to portfolio value (-10% daily as extreme).
pub fn risk_score(risk: &RiskMetrics, total_value: f64) -> f64 {
    let vol_score = risk
        .volatility
        .map(|v| (v / 0.50).min(1.0) * 40.0)
        .unwrap_or(0.0);

    let dd_score = risk
        .max_drawdown
        .map(|dd| (-dd / 50.0).clamp(0.0, 1.0) * 30.0)
        .unwrap_or(0.0);

    let beta_score = risk
        .beta
        .map(|b| (b.abs().min(2.0) / 2.0) * 20.0)
        .unwrap_or(0.0);

    let var_score = match risk.var_95 {
        Some(var) if total_value > 0.0 => {
            let loss_pct = (-var / total_value * 100.0).clamp(0.0, 10.0);
            loss_pct / 10.0 * 10.0
        }
        _ => 0.0,
    };

    (vol_score + dd_score + beta_score + var_score).min(100.0)
}

/// Average of the sector and geographic diversity scores.
pub fn diversification_score(diversification: &DiversificationMetrics) -> f64 {
    (diversification.sector_diversity_score + diversification.geographic_diversity_score) / 2.0
}
