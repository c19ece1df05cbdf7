use serde::{Deserialize, Serialize};

/// A position within a portfolio. Owned by the CRUD layer; the engine only
/// ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    /// Number of shares held, always > 0.
    pub quantity: f64,
    /// Average cost basis per share.
    pub avg_price: f64,
    /// Market / currency tag (e.g. "US", "TW").
    pub market: String,
    /// Sector classification; unknown sectors bucket under "Unknown".
    pub sector: Option<String>,
    /// Country classification; unknown countries bucket under "Unknown".
    pub country: Option<String>,
}

impl Holding {
    pub fn sector_label(&self) -> &str {
        self.sector.as_deref().unwrap_or("Unknown")
    }

    pub fn country_label(&self) -> &str {
        self.country.as_deref().unwrap_or("Unknown")
    }
}
