// Shared test fixtures: an in-memory feed with injectable failures.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

use portfolio_ledger_core::errors::LedgerError;
use portfolio_ledger_core::feed::FeedAdapter;
use portfolio_ledger_core::models::price::{DividendPoint, PricePoint};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory `FeedAdapter`. Symbols in `failing` error on every call,
/// everything else answers from the configured maps (missing window = empty
/// series, missing currency = "USD").
#[derive(Default)]
pub struct MockFeed {
    closes: HashMap<String, Vec<PricePoint>>,
    dividends: HashMap<String, Vec<DividendPoint>>,
    currencies: HashMap<String, String>,
    fx: HashMap<(String, String), Vec<PricePoint>>,
    failing: HashSet<String>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_close(mut self, symbol: &str, date: NaiveDate, price: f64) -> Self {
        let series = self.closes.entry(symbol.to_string()).or_default();
        series.push(PricePoint { date, price });
        series.sort_by_key(|p| p.date);
        self
    }

    /// The same close price on every day of `[from, to]`.
    pub fn with_flat_closes(
        mut self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        price: f64,
    ) -> Self {
        let series = self.closes.entry(symbol.to_string()).or_default();
        let mut d = from;
        while d <= to {
            series.push(PricePoint { date: d, price });
            d += Duration::days(1);
        }
        series.sort_by_key(|p| p.date);
        self
    }

    pub fn with_dividend(mut self, symbol: &str, date: NaiveDate, amount: f64) -> Self {
        let series = self.dividends.entry(symbol.to_string()).or_default();
        series.push(DividendPoint { date, amount });
        series.sort_by_key(|p| p.date);
        self
    }

    pub fn with_currency(mut self, symbol: &str, currency: &str) -> Self {
        self.currencies
            .insert(symbol.to_string(), currency.to_string());
        self
    }

    /// A flat FX rate for the pair on every day of `[from, to]`.
    pub fn with_flat_fx(
        mut self,
        from_ccy: &str,
        to_ccy: &str,
        from: NaiveDate,
        to: NaiveDate,
        rate: f64,
    ) -> Self {
        let series = self
            .fx
            .entry((from_ccy.to_string(), to_ccy.to_string()))
            .or_default();
        let mut d = from;
        while d <= to {
            series.push(PricePoint { date: d, price: rate });
            d += Duration::days(1);
        }
        series.sort_by_key(|p| p.date);
        self
    }

    /// Every call for `symbol` returns an `Api` error.
    pub fn failing_for(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn check_failing(&self, symbol: &str) -> Result<(), LedgerError> {
        if self.failing.contains(symbol) {
            return Err(LedgerError::Api {
                provider: "MockFeed".into(),
                message: format!("simulated failure for {symbol}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FeedAdapter for MockFeed {
    fn name(&self) -> &str {
        "MockFeed"
    }

    async fn close_prices(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        self.check_failing(symbol)?;
        Ok(self
            .closes
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn dividends(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DividendPoint>, LedgerError> {
        self.check_failing(symbol)?;
        Ok(self
            .dividends
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn currency(&self, symbol: &str) -> Result<String, LedgerError> {
        self.check_failing(symbol)?;
        Ok(self
            .currencies
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| "USD".to_string()))
    }

    async fn fx_rates(
        &self,
        from_ccy: &str,
        to_ccy: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        if from_ccy == to_ccy {
            let mut series = Vec::new();
            let mut d = from;
            while d <= to {
                series.push(PricePoint { date: d, price: 1.0 });
                d += Duration::days(1);
            }
            return Ok(series);
        }

        Ok(self
            .fx
            .get(&(from_ccy.to_string(), to_ccy.to_string()))
            .map(|series| {
                series
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
