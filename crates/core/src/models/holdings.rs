use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::series::latest_at_or_before;

/// Cumulative positions as of one transaction date.
///
/// The map is sparse: an absent instrument means "no position". Positive
/// counts are long positions, negative counts are open shorts. Every row
/// covers every instrument ever traded up to its date, not just the ones
/// transacted that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsRow {
    pub date: NaiveDate,
    pub positions: HashMap<String, i64>,
}

/// Date-ordered sequence of holdings snapshots, one row per distinct
/// transaction date. Rebuilt from scratch by `HoldingsService`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsTable {
    pub rows: Vec<HoldingsRow>,
}

impl HoldingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Date of the earliest snapshot, if any.
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// The snapshot row in effect on `date` (nearest prior date).
    pub fn as_of(&self, date: NaiveDate) -> Option<&HoldingsRow> {
        latest_at_or_before(&self.rows, date, |r| r.date)
    }

    /// Signed positions in effect on `date`; empty when no snapshot applies.
    pub fn positions_as_of(&self, date: NaiveDate) -> HashMap<String, i64> {
        self.as_of(date)
            .map(|r| r.positions.clone())
            .unwrap_or_default()
    }

    /// Signed share count for one instrument on `date` (0 = no position).
    pub fn shares_as_of(&self, ticker: &str, date: NaiveDate) -> i64 {
        self.as_of(date)
            .and_then(|r| r.positions.get(ticker).copied())
            .unwrap_or(0)
    }

    /// Every instrument that appears in any snapshot, sorted.
    pub fn instruments(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .rows
            .iter()
            .flat_map(|r| r.positions.keys())
            .collect();
        set.into_iter().cloned().collect()
    }
}
