pub(crate) mod analytics;
pub(crate) mod health;
pub(crate) mod insights;
pub(crate) mod rebalance;
