use serde::{Deserialize, Serialize};

use super::analytics::PortfolioAnalytics;
use super::rebalance::{RebalanceAction, RebalanceCheck};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSummary {
    pub strengths: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Presentation-ready roll-up of analytics, triggers, and top recommended
/// trades. Recomputed on every request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    /// 0-100 composite health score; higher is better.
    pub overall_score: f64,
    pub summary: InsightSummary,
    pub analytics: PortfolioAnalytics,
    /// Top non-Hold actions from the latest pending proposal, if any.
    pub recommendations: Vec<RebalanceAction>,
    pub rebalance_check: RebalanceCheck,
}
