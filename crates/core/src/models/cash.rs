use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::latest_at_or_before;

/// Running cash balance as of one event date, in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEntry {
    pub date: NaiveDate,
    pub balance: f64,
}

/// Date-ordered cash balance series: one entry per day on which a
/// cash-moving event (transaction or dividend) was processed. Built and
/// extended incrementally by `CashService`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashSeries {
    pub entries: Vec<CashEntry>,
}

impl CashSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent balance on or before `date`, or `None`.
    pub fn balance_as_of(&self, date: NaiveDate) -> Option<f64> {
        latest_at_or_before(&self.entries, date, |e| e.date).map(|e| e.balance)
    }

    /// Latest recorded entry — the resume point for incremental builds.
    pub fn last(&self) -> Option<&CashEntry> {
        self.entries.last()
    }

    /// Insert or replace the entry for `date` (last write wins per date).
    pub fn upsert(&mut self, date: NaiveDate, balance: f64) {
        match self.entries.binary_search_by_key(&date, |e| e.date) {
            Ok(idx) => self.entries[idx].balance = balance,
            Err(idx) => self.entries.insert(idx, CashEntry { date, balance }),
        }
    }
}
