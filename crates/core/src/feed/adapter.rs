use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::LedgerError;
use crate::models::price::{DividendPoint, PricePoint};

/// Market-data collaborator the ledger builders call.
///
/// Error semantics are explicit so callers never have to string-match:
/// `Ok` with an empty series means "no data for that window" (market closed,
/// nothing paid, unknown symbol), while `Err` means the feed itself failed.
/// Bulk builders treat `Err` as non-fatal per instrument; required single
/// lookups (index series) escalate it.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Human-readable name of this feed (for logs/errors).
    fn name(&self) -> &str;

    /// Daily close prices in the instrument's own trading currency,
    /// inclusive date range. May be empty.
    async fn close_prices(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError>;

    /// Per-share dividend events, inclusive date range. May be empty.
    async fn dividends(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DividendPoint>, LedgerError>;

    /// The instrument's 3-letter trading currency. Stable for the process
    /// lifetime, so implementations cache it per symbol.
    async fn currency(&self, symbol: &str) -> Result<String, LedgerError>;

    /// Daily FX rates for `from_ccy` → `to_ccy`, inclusive date range.
    /// A same-currency pair yields a flat 1.0 series.
    async fn fx_rates(
        &self,
        from_ccy: &str,
        to_ccy: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError>;
}

/// Per-symbol trading-currency cache.
///
/// Owned by the feed rather than living in process-global state, with an
/// explicit `clear` so tests stay deterministic. The inner mutex lets
/// `&self` trait methods fill it.
#[derive(Debug, Default)]
pub struct CurrencyCache {
    inner: Mutex<HashMap<String, String>>,
}

impl CurrencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|map| map.get(symbol).cloned())
    }

    pub fn insert(&self, symbol: &str, currency: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(symbol.to_string(), currency.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
