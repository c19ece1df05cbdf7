use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::market_provider::{MarketDataProvider, ProviderError};
use crate::models::PricePoint;

/// Market-data client talking to the quote/history HTTP service.
pub struct HttpMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
    benchmark_symbol: String,
}

impl HttpMarketDataProvider {
    pub fn new(base_url: String, benchmark_symbol: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            benchmark_symbol,
        }
    }

    /// The benchmark symbol comes from the engine config so it is decided in
    /// exactly one place.
    pub fn from_env(benchmark_symbol: &str) -> Result<Self, ProviderError> {
        let base_url = std::env::var("MARKET_DATA_URL")
            .map_err(|_| ProviderError::BadResponse("MARKET_DATA_URL not set".into()))?;

        Ok(Self::new(base_url, benchmark_symbol.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    current_price: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    values: Vec<HistoryValue>,
}

#[derive(Debug, Deserialize)]
struct HistoryValue {
    date: String,
    close: f64,
}

impl HistoryResponse {
    fn into_series(self) -> Result<Vec<PricePoint>, ProviderError> {
        let mut series = self
            .values
            .into_iter()
            .map(|v| {
                let date = NaiveDate::parse_from_str(&v.date, "%Y-%m-%d")
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                Ok(PricePoint {
                    date,
                    close: v.close,
                })
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        // The engine requires ascending order; providers disagree on it.
        series.sort_by_key(|p| p.date);
        Ok(series)
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    async fn quote(&self, ticker: &str) -> Result<f64, ProviderError> {
        let url = format!("{}/quote/{}", self.base_url, ticker);

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
                "quote for {} returned {}",
                ticker,
                resp.status()
            )));
        }

        let body: QuoteResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(body.current_price)
    }

    async fn history(&self, ticker: &str, days: u32) -> Result<Vec<PricePoint>, ProviderError> {
        let url = format!("{}/history/{}", self.base_url, ticker);

        let resp = self
            .client
            .get(&url)
            .query(&[("days", days.to_string())])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "history for {} returned {}",
                ticker,
                resp.status()
            )));
        }

        let body: HistoryResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        body.into_series()
    }

    async fn benchmark(&self, days: u32) -> Result<Vec<PricePoint>, ProviderError> {
        let symbol = self.benchmark_symbol.clone();
        self.history(&symbol, days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_takes_benchmark_from_caller() {
        std::env::set_var("MARKET_DATA_URL", "http://localhost:9");

        let provider = HttpMarketDataProvider::from_env("QQQ").unwrap();

        assert_eq!(provider.benchmark_symbol, "QQQ");
        assert_eq!(provider.base_url, "http://localhost:9");
    }

    #[test]
    fn test_history_response_sorts_ascending() {
        let response = HistoryResponse {
            values: vec![
                HistoryValue {
                    date: "2024-01-03".to_string(),
                    close: 102.0,
                },
                HistoryValue {
                    date: "2024-01-01".to_string(),
                    close: 100.0,
                },
                HistoryValue {
                    date: "2024-01-02".to_string(),
                    close: 101.0,
                },
            ],
        };

        let series = response.into_series().unwrap();

        let closes: Vec<f64> = series.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![100.0, 101.0, 102.0]);
    }
}
