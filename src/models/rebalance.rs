use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categorical urgency of rebalancing, derived from the numeric score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Severity::High
        } else if score >= 40.0 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

/// Result of evaluating the rebalance policy against an analytics snapshot.
/// Recomputed on demand; never persisted as identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceCheck {
    pub needs_rebalancing: bool,
    /// Human-readable reasons, in rule order.
    pub triggers: Vec<String>,
    pub severity: Severity,
    /// Magnitude-weighted rule score, clipped to [0, 100].
    pub severity_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Hold,
    Increase,
    Reduce,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    Drift,
    RiskReduction,
    Diversification,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

/// One proposed trade. Weights are percentages of total portfolio value;
/// `amount` is the signed dollar value of the trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub ticker: String,
    pub action: TradeAction,
    pub current_weight: f64,
    pub target_weight: f64,
    pub current_shares: f64,
    pub target_shares: f64,
    pub shares_diff: f64,
    pub current_price: f64,
    pub amount: f64,
    pub reason: String,
}

/// A concrete rebalancing plan. Actions are always carried in structured
/// form; any string encoding happens only at a wire/persistence boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceProposal {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub proposal_type: ProposalType,
    pub trigger_reason: String,
    pub current_risk_score: f64,
    pub target_risk_score: f64,
    pub current_diversification_score: f64,
    pub target_diversification_score: f64,
    pub actions: Vec<RebalanceAction>,
    /// Change in expected return (fraction) if the proposal is applied.
    pub expected_return_change: f64,
    /// Change in the 0-100 risk score if the proposal is applied.
    pub expected_risk_change: f64,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Caller decision on a pending proposal. Execution itself stays manual.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposalDecision {
    Accepted,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(Severity::from_score(0.0), Severity::None);
        assert_eq!(Severity::from_score(10.0), Severity::Low);
        assert_eq!(Severity::from_score(40.0), Severity::Medium);
        assert_eq!(Severity::from_score(70.0), Severity::High);
        assert_eq!(Severity::from_score(100.0), Severity::High);
    }
}
