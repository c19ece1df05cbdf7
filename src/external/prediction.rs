use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::market_provider::ProviderError;

/// Per-ticker output of the external price-prediction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub ticker: String,
    /// Predicted price change over the model horizon, in percent.
    pub change_percent: f64,
    /// Model confidence in [0, 1].
    pub confidence: f64,
}

impl Prediction {
    /// A zero-signal prediction, used when the model is unreachable.
    pub fn neutral(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            change_percent: 0.0,
            confidence: 0.0,
        }
    }
}

/// Prediction-model collaborator. Training and inference live elsewhere; the
/// engine only consumes scores.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    async fn predict(&self, ticker: &str) -> Result<Prediction, ProviderError>;
}

/// Fallback provider that returns zero-signal predictions for every ticker.
/// Selected when no prediction service is deployed; proposals then lean on
/// momentum and diversification alone.
pub struct NeutralPredictionProvider;

#[async_trait]
impl PredictionProvider for NeutralPredictionProvider {
    async fn predict(&self, ticker: &str) -> Result<Prediction, ProviderError> {
        Ok(Prediction::neutral(ticker))
    }
}
