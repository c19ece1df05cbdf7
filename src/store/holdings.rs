use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Holding;

/// Read-only view of the holdings owned by the external CRUD layer.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    async fn fetch_holdings(&self, portfolio_id: Uuid) -> Result<Vec<Holding>, AppError>;
}

/// In-memory holdings store. The persistence technology behind holdings is
/// out of scope here; this keeps the engine contract intact for the server
/// binary and the tests.
#[derive(Default)]
pub struct InMemoryHoldingsStore {
    holdings: DashMap<Uuid, Vec<Holding>>,
}

impl InMemoryHoldingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, portfolio_id: Uuid, holdings: Vec<Holding>) {
        self.holdings.insert(portfolio_id, holdings);
    }
}

#[async_trait]
impl HoldingsStore for InMemoryHoldingsStore {
    async fn fetch_holdings(&self, portfolio_id: Uuid) -> Result<Vec<Holding>, AppError> {
        self.holdings
            .get(&portfolio_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("portfolio {} not found", portfolio_id)))
    }
}
