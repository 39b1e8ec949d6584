use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::cash::CashSeries;
use crate::models::holdings::HoldingsTable;
use crate::models::price::PriceTable;

/// The three time-indexed ledgers, queried together by the valuation engine.
///
/// Single-writer: the facade serializes all mutation; there is no internal
/// locking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStore {
    pub holdings: HoldingsTable,
    pub prices: PriceTable,
    pub cash: CashSeries,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed positions in effect on `date` (empty before the first trade).
    pub fn holdings_as_of(&self, date: NaiveDate) -> HashMap<String, i64> {
        self.holdings.positions_as_of(date)
    }

    /// Most recent price for `ticker` on or before `date`.
    pub fn price_as_of(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.prices.price_as_of(ticker, date)
    }

    /// Most recent cash balance on or before `date`.
    pub fn cash_as_of(&self, date: NaiveDate) -> Option<f64> {
        self.cash.balance_as_of(date)
    }
}
