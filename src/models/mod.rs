mod holding;
mod price_point;
pub mod analytics;
pub mod insights;
pub mod rebalance;

pub use analytics::{
    DiversificationMetrics, PerformanceMetrics, PortfolioAnalytics, RiskMetrics,
};
pub use holding::Holding;
pub use insights::{InsightSummary, Insights};
pub use price_point::{PricePoint, TickerQuote};
pub use rebalance::{
    ProposalDecision, ProposalStatus, ProposalType, RebalanceAction, RebalanceCheck,
    RebalanceProposal, Severity, TradeAction,
};
