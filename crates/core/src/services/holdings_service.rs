use std::collections::HashMap;

use log::{debug, info};

use crate::errors::LedgerError;
use crate::models::holdings::{HoldingsRow, HoldingsTable};
use crate::models::transaction::Transaction;
use crate::validation::{validate_transactions, ValidationMode};

/// Rebuilds the holdings snapshot table from the transaction log.
///
/// Pure business logic — no I/O, no feed calls.
pub struct HoldingsService;

impl HoldingsService {
    pub fn new() -> Self {
        Self
    }

    /// Full rebuild: one snapshot row per distinct transaction date, each row
    /// carrying the cumulative signed position of every instrument traded so
    /// far. Buy/Cover add shares, Sell/Short subtract; a count that nets to
    /// zero is dropped from the row (sparse "no position" sentinel).
    ///
    /// Validation runs before any computation, so a bad log never produces a
    /// partial table. Rebuilding an unchanged log yields an identical table.
    /// An empty log yields an empty table, which is not an error.
    pub fn rebuild(
        &self,
        transactions: &[Transaction],
        mode: ValidationMode,
    ) -> Result<HoldingsTable, LedgerError> {
        validate_transactions(transactions, mode)?;

        if transactions.is_empty() {
            debug!("holdings rebuild: empty transaction log");
            return Ok(HoldingsTable::new());
        }

        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by(|a, b| a.date.cmp(&b.date));

        let mut running: HashMap<String, i64> = HashMap::new();
        let mut rows: Vec<HoldingsRow> = Vec::new();

        for txn in sorted {
            let delta = if txn.kind.is_inflow() {
                txn.amount as i64
            } else {
                -(txn.amount as i64)
            };

            let count = running.entry(txn.ticker.clone()).or_insert(0);
            *count += delta;
            if *count == 0 {
                running.remove(&txn.ticker);
            }

            match rows.last_mut() {
                Some(row) if row.date == txn.date => row.positions = running.clone(),
                _ => rows.push(HoldingsRow {
                    date: txn.date,
                    positions: running.clone(),
                }),
            }
        }

        let table = HoldingsTable { rows };
        info!(
            "holdings rebuilt: {} snapshot dates, {} instruments",
            table.rows.len(),
            table.instruments().len()
        );

        Ok(table)
    }
}

impl Default for HoldingsService {
    fn default() -> Self {
        Self::new()
    }
}
