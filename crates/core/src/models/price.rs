use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::series::latest_at_or_before;

/// A single dated price. Also used for FX rates (rate in place of price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A single dated per-share dividend amount, in the instrument's currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendPoint {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Per-instrument daily price series, denominated in the base currency.
///
/// Invariant maintained by `PriceService`: a point exists for every day on
/// which the instrument had a non-zero holding (long or short), so
/// mark-to-market works for both position directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// instrument symbol → date-sorted price points
    pub entries: HashMap<String, Vec<PricePoint>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent price on or before `date`, or `None`.
    pub fn price_as_of(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        let entries = self.entries.get(ticker)?;
        latest_at_or_before(entries, date, |p| p.date).map(|p| p.price)
    }

    /// True when an exact (instrument, date) point exists.
    pub fn contains(&self, ticker: &str, date: NaiveDate) -> bool {
        self.entries
            .get(ticker)
            .is_some_and(|entries| entries.binary_search_by_key(&date, |p| p.date).is_ok())
    }

    /// Insert or replace the point for (ticker, date).
    pub fn insert(&mut self, ticker: &str, date: NaiveDate, price: f64) {
        let entries = self.entries.entry(ticker.to_string()).or_default();
        match entries.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => entries[idx].price = price,
            Err(idx) => entries.insert(idx, PricePoint { date, price }),
        }
    }

    /// Insert only when no point exists for (ticker, date). Returns whether
    /// a point was inserted. This is the idempotent-merge primitive: filled
    /// slots are never overwritten.
    pub fn insert_if_absent(&mut self, ticker: &str, date: NaiveDate, price: f64) -> bool {
        let entries = self.entries.entry(ticker.to_string()).or_default();
        match entries.binary_search_by_key(&date, |p| p.date) {
            Ok(_) => false,
            Err(idx) => {
                entries.insert(idx, PricePoint { date, price });
                true
            }
        }
    }

    /// Latest date present for any instrument; the price build resumes from
    /// the day after this.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.entries
            .values()
            .filter_map(|entries| entries.last().map(|p| p.date))
            .max()
    }

    /// Total number of stored price points.
    pub fn total_points(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
