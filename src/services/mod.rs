pub mod analytics_service;
pub mod insight_service;
pub mod market_data_service;
pub mod metrics_service;
pub mod proposal_service;
pub mod quote_cache;
pub mod trigger_service;
