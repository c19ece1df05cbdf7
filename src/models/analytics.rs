use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Return metrics for a portfolio.
///
/// Return values are fractions (0.10 = +10%); dollar values are in the
/// portfolio's base currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub total_value: f64,
    pub total_cost: f64,
    /// (value - cost) / cost. `None` when cost is zero.
    pub total_return: Option<f64>,
    pub total_gain: f64,
    /// Relative change between the two most recent stored value snapshots.
    pub daily_return: Option<f64>,
    /// Geometric annualization of the trailing snapshot-return series on a
    /// 252-trading-day basis.
    pub annualized_return: Option<f64>,
}

/// Risk metrics for a portfolio. Every field is `None` when the stored
/// history is too short for the metric, never zero and never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Annualized standard deviation of daily returns, as a fraction.
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    /// Maximum peak-to-trough decline, as a negative percentage.
    pub max_drawdown: Option<f64>,
    pub beta: Option<f64>,
    pub alpha: Option<f64>,
    /// 1-day 95% Value at Risk in dollars (negative = loss).
    pub var_95: Option<f64>,
}

/// How evenly value is spread across holdings, sectors, and countries.
///
/// Scores are 0-100; distributions map category -> weight % and sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiversificationMetrics {
    pub sector_diversity_score: f64,
    pub geographic_diversity_score: f64,
    /// Combined weight % of the 5 largest holdings.
    pub concentration_risk: f64,
    pub sector_distribution: BTreeMap<String, f64>,
    pub country_distribution: BTreeMap<String, f64>,
}

/// Immutable analytics snapshot for a portfolio at a point in time.
///
/// Snapshots are append-only: once created they are never mutated, and the
/// stored series of snapshot values feeds the return/risk history metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioAnalytics {
    pub portfolio_id: Uuid,
    pub performance: PerformanceMetrics,
    pub risk: RiskMetrics,
    pub diversification: DiversificationMetrics,
    /// Per-ticker weight % of total value; sums to 100 across included
    /// holdings.
    pub holding_weights: BTreeMap<String, f64>,
    /// Tickers whose price came from the cache after a fetch failure.
    pub stale_tickers: Vec<String>,
    /// Tickers excluded from weighted sums because no usable price exists.
    pub excluded_tickers: Vec<String>,
    pub snapshot_date: DateTime<Utc>,
}
