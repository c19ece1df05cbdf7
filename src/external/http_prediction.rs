use async_trait::async_trait;
use serde::Deserialize;

use super::market_provider::ProviderError;
use super::prediction::{Prediction, PredictionProvider};

/// Client for the external LSTM prediction service.
pub struct HttpPredictionProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url = std::env::var("PREDICTION_URL")
            .map_err(|_| ProviderError::BadResponse("PREDICTION_URL not set".into()))?;

        Ok(Self::new(base_url))
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    change_percent: f64,
    confidence: f64,
}

#[async_trait]
impl PredictionProvider for HttpPredictionProvider {
    async fn predict(&self, ticker: &str) -> Result<Prediction, ProviderError> {
        let url = format!("{}/predict/{}", self.base_url, ticker);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "predict for {} returned {}",
                ticker,
                resp.status()
            )));
        }

        let body: PredictResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(Prediction {
            ticker: ticker.to_string(),
            change_percent: body.change_percent,
            confidence: body.confidence.clamp(0.0, 1.0),
        })
    }
}
