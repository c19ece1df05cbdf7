pub mod http_market;
pub mod http_prediction;
pub mod market_provider;
pub mod prediction;
