use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mark-to-market snapshot of the whole account at one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Date this summary was computed for
    pub date: NaiveDate,

    /// Base currency of all monetary values
    pub currency: String,

    /// Per-instrument breakdown, largest absolute value first
    pub positions: Vec<PositionSummary>,

    /// Cash balance as of `date` (0 when no cash entry applies yet)
    pub cash: f64,

    /// Σ signed position values + cash
    pub total_value: f64,
}

/// One open position inside a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    pub ticker: String,

    /// Signed share count (negative = open short)
    pub shares: i64,

    /// Price per share in the base currency
    pub price: f64,

    /// shares × price (negative for shorts)
    pub value: f64,
}
