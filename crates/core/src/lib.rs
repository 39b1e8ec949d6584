pub mod errors;
pub mod feed;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;
pub mod validation;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use log::debug;

use errors::LedgerError;
use feed::FeedAdapter;
use models::summary::PortfolioSummary;
use models::transaction::Transaction;
use services::{CashService, HoldingsService, PriceService, ValuationService};
use storage::LedgerState;
use store::LedgerStore;
use validation::{validate_currency, validate_initial_cash, validate_transactions, ValidationMode};

/// Main entry point: one investment account's point-in-time ledger.
///
/// Owns the append-only transaction log and the three derived tables
/// (holdings, prices, cash), plus the services that build and query them.
/// Callers serialize access; nothing here locks.
#[must_use]
pub struct PortfolioLedger {
    base_currency: String,
    initial_cash: f64,
    transactions: Vec<Transaction>,
    store: LedgerStore,
    mode: ValidationMode,
    holdings_service: HoldingsService,
    price_service: PriceService,
    cash_service: CashService,
    valuation_service: ValuationService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioLedger")
            .field("base_currency", &self.base_currency)
            .field("transactions", &self.transactions.len())
            .field("holdings_rows", &self.store.holdings.rows.len())
            .field("price_points", &self.store.prices.total_points())
            .field("cash_entries", &self.store.cash.entries.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioLedger {
    /// Create a ledger for a new account. The transaction log is validated
    /// up front; nothing is built until [`rebuild`](Self::rebuild) runs.
    pub fn new(
        base_currency: impl Into<String>,
        initial_cash: f64,
        transactions: Vec<Transaction>,
    ) -> Result<Self, LedgerError> {
        Self::with_mode(base_currency, initial_cash, transactions, ValidationMode::Standard)
    }

    /// Like [`new`](Self::new), but with an explicit validation mode
    /// (legacy logs accept Buy/Sell only).
    pub fn with_mode(
        base_currency: impl Into<String>,
        initial_cash: f64,
        transactions: Vec<Transaction>,
        mode: ValidationMode,
    ) -> Result<Self, LedgerError> {
        let base_currency = base_currency.into().trim().to_uppercase();
        validate_currency(&base_currency)?;
        validate_initial_cash(initial_cash)?;
        validate_transactions(&transactions, mode)?;

        Ok(Self::build(
            LedgerState {
                base_currency,
                initial_cash,
                transactions,
                store: LedgerStore::new(),
            },
            mode,
        ))
    }

    // ── Building ────────────────────────────────────────────────────

    /// Bring all three tables up to `today`, in dependency order:
    /// holdings (full rebuild) → prices (extend) → cash (incremental replay).
    ///
    /// Cash replay reads prices and holdings, so the order is fixed. Safe to
    /// call repeatedly; an unchanged log yields unchanged tables.
    pub async fn rebuild(
        &mut self,
        feed: &dyn FeedAdapter,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        self.store.holdings = self.holdings_service.rebuild(&self.transactions, self.mode)?;

        if self.transactions.is_empty() {
            debug!("empty transaction log: nothing to price or replay");
            self.dirty = true;
            return Ok(());
        }

        self.price_service
            .extend(
                feed,
                &self.base_currency,
                &self.transactions,
                &self.store.holdings,
                &mut self.store.prices,
                today,
            )
            .await?;

        self.cash_service
            .extend(
                feed,
                &self.base_currency,
                self.initial_cash,
                &self.transactions,
                &self.store.holdings,
                &self.store.prices,
                &mut self.store.cash,
                today,
            )
            .await?;

        self.dirty = true;
        Ok(())
    }

    /// [`rebuild`](Self::rebuild) through the current date.
    pub async fn update(&mut self, feed: &dyn FeedAdapter) -> Result<(), LedgerError> {
        self.rebuild(feed, chrono::Utc::now().date_naive()).await
    }

    /// Append new transactions to the log. The tables are stale afterwards
    /// until the next [`rebuild`](Self::rebuild).
    pub fn append_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(), LedgerError> {
        validate_transactions(&transactions, self.mode)?;
        self.transactions.extend(transactions);
        self.dirty = true;
        Ok(())
    }

    // ── Point-in-time queries ───────────────────────────────────────

    /// Signed positions in effect on `date` (empty before the first trade).
    #[must_use]
    pub fn holdings_as_of(&self, date: NaiveDate) -> HashMap<String, i64> {
        self.store.holdings_as_of(date)
    }

    /// Every instrument ever traded, sorted. Includes instruments whose
    /// positions have since closed.
    #[must_use]
    pub fn instruments(&self) -> Vec<String> {
        self.store.holdings.instruments()
    }

    /// Price of one instrument as of `date`. Unlike aggregate valuation,
    /// a direct lookup miss is an error the caller sees.
    pub fn price_as_of(&self, ticker: &str, date: NaiveDate) -> Result<f64, LedgerError> {
        let ticker = ticker.to_uppercase();
        self.store
            .price_as_of(&ticker, date)
            .ok_or(LedgerError::PriceNotAvailable {
                symbol: ticker,
                date: date.to_string(),
            })
    }

    /// Cash balance as of `date`, or `None` before the seed entry.
    #[must_use]
    pub fn cash_as_of(&self, date: NaiveDate) -> Option<f64> {
        self.store.cash_as_of(date)
    }

    // ── Valuation & returns ─────────────────────────────────────────

    /// Mark-to-market portfolio value on one date.
    #[must_use]
    pub fn value_at(&self, date: NaiveDate) -> f64 {
        self.valuation_service.value_at(&self.store, date)
    }

    /// Daily portfolio value over `[from, to]`.
    pub fn portfolio_value(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, LedgerError> {
        self.valuation_service.portfolio_value(&self.store, from, to)
    }

    /// Period return per instrument over `[from, to]`.
    pub fn stock_returns(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<String, f64>, LedgerError> {
        self.valuation_service
            .stock_returns(&self.store, &self.transactions, from, to)
    }

    /// Benchmark return series for an index symbol over `[from, to]`.
    pub async fn index_returns(
        &self,
        feed: &dyn FeedAdapter,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, LedgerError> {
        self.valuation_service
            .index_returns(feed, symbol, from, to)
            .await
    }

    /// Account snapshot at `date`: open positions, cash, total value.
    #[must_use]
    pub fn summary(&self, date: NaiveDate) -> PortfolioSummary {
        self.valuation_service
            .summary(&self.store, date, &self.base_currency)
    }

    /// The summary as pretty-printed JSON.
    pub fn export_summary_json(&self, date: NaiveDate) -> Result<String, LedgerError> {
        let summary = self.summary(date);
        serde_json::to_string_pretty(&summary)
            .map_err(|e| LedgerError::Serialization(format!("Failed to serialize summary: {e}")))
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Restore a ledger from encrypted bytes (password required).
    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<Self, LedgerError> {
        let state = storage::load_from_bytes(data, password)?;
        Ok(Self::build(state, ValidationMode::Standard))
    }

    /// Encrypt the full ledger state to portable bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, LedgerError> {
        let bytes = storage::save_to_bytes(&self.state(), password)?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Restore a ledger from an encrypted file on disk.
    pub fn load_from_file(path: impl AsRef<Path>, password: &str) -> Result<Self, LedgerError> {
        let state = storage::load_from_file(path, password)?;
        Ok(Self::build(state, ValidationMode::Standard))
    }

    /// Save the ledger to an encrypted file on disk.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_file(
        &mut self,
        path: impl AsRef<Path>,
        password: &str,
    ) -> Result<(), LedgerError> {
        storage::save_to_file(&self.state(), path, password)?;
        self.dirty = false;
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The append-only transaction log, as recorded.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    #[must_use]
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    #[must_use]
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Read access to the built tables.
    #[must_use]
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Returns `true` if the ledger changed since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(state: LedgerState, mode: ValidationMode) -> Self {
        Self {
            base_currency: state.base_currency,
            initial_cash: state.initial_cash,
            transactions: state.transactions,
            store: state.store,
            mode,
            holdings_service: HoldingsService::new(),
            price_service: PriceService::new(),
            cash_service: CashService::new(),
            valuation_service: ValuationService::new(),
            dirty: false,
        }
    }

    fn state(&self) -> LedgerState {
        LedgerState {
            base_currency: self.base_currency.clone(),
            initial_cash: self.initial_cash,
            transactions: self.transactions.clone(),
            store: self.store.clone(),
        }
    }
}
