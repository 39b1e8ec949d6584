use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::LedgerError;
use crate::feed::FeedAdapter;
use crate::models::series::latest_at_or_before;
use crate::models::summary::{PortfolioSummary, PositionSummary};
use crate::models::transaction::Transaction;
use crate::store::LedgerStore;

/// Mark-to-market valuation and period returns over the three ledgers.
///
/// All lookups go through the nearest-prior-date query, so holdings, price,
/// and cash reads share one temporal semantics.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Portfolio value on one date: Σ signed shares × price, plus cash.
    ///
    /// An instrument with no resolvable price contributes zero rather than
    /// aborting the aggregate; a date before the first cash entry counts
    /// cash as zero.
    pub fn value_at(&self, store: &LedgerStore, date: NaiveDate) -> f64 {
        let positions = store.holdings_as_of(date);

        let position_value: f64 = positions
            .iter()
            .filter(|(_, shares)| **shares != 0)
            .map(|(ticker, shares)| match store.price_as_of(ticker, date) {
                Some(price) => *shares as f64 * price,
                None => {
                    debug!("no price for {ticker} as of {date}, counting position as 0");
                    0.0
                }
            })
            .sum();

        position_value + store.cash_as_of(date).unwrap_or(0.0)
    }

    /// Daily portfolio value over `[from, to]`, one entry per calendar day.
    pub fn portfolio_value(
        &self,
        store: &LedgerStore,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, LedgerError> {
        if from > to {
            return Err(LedgerError::Validation(format!(
                "invalid date range: {from} is after {to}"
            )));
        }

        Ok(from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|d| (d, self.value_at(store, d)))
            .collect())
    }

    /// Modified-Dietz-style period return per instrument over `[from, to]`.
    ///
    /// Covers every instrument either held at `from` or traded inside the
    /// period. Period cash flows are valued at ledger prices: outflows are
    /// Buy/Cover amounts, inflows are Sell/Short amounts, and a transaction
    /// whose price cannot be resolved is skipped with a warning.
    ///
    /// Closed position (end value zero after prior value or activity):
    /// return = (end − start − net) / (|start| + outflows). Open position:
    /// return = (end − start − net) / |start + net|. Either way a zero
    /// denominator means the return is undefined and the instrument is
    /// omitted from the result.
    pub fn stock_returns(
        &self,
        store: &LedgerStore,
        transactions: &[Transaction],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<String, f64>, LedgerError> {
        if from > to {
            return Err(LedgerError::Validation(format!(
                "invalid date range: {from} is after {to}"
            )));
        }

        let mut tickers: BTreeSet<String> = store
            .holdings_as_of(from)
            .into_iter()
            .filter(|(_, shares)| *shares != 0)
            .map(|(ticker, _)| ticker)
            .collect();
        for txn in transactions {
            if txn.date > from && txn.date <= to {
                tickers.insert(txn.ticker.clone());
            }
        }

        let mut returns = HashMap::new();

        for ticker in tickers {
            let start_shares = store.holdings.shares_as_of(&ticker, from);
            let start_value = if start_shares == 0 {
                0.0
            } else {
                start_shares as f64 * store.price_as_of(&ticker, from).unwrap_or(0.0)
            };

            let mut outflows = 0.0;
            let mut inflows = 0.0;
            for txn in transactions
                .iter()
                .filter(|t| t.ticker == ticker && t.date > from && t.date <= to)
            {
                let Some(price) = store.price_as_of(&ticker, txn.date) else {
                    warn!(
                        "no price for {ticker} on {}, excluding {} from the return of [{from}, {to}]",
                        txn.date, txn.kind
                    );
                    continue;
                };
                let cash = txn.amount as f64 * price;
                if txn.kind.is_inflow() {
                    outflows += cash; // Buy/Cover: cash paid out, shares in
                } else {
                    inflows += cash; // Sell/Short: cash received
                }
            }

            let end_shares = store.holdings.shares_as_of(&ticker, to);
            let end_value = if end_shares == 0 {
                0.0
            } else {
                end_shares as f64 * store.price_as_of(&ticker, to).unwrap_or(0.0)
            };

            let net_investment = outflows - inflows;
            let gain = end_value - start_value - net_investment;

            if start_value == 0.0 && outflows == 0.0 && inflows == 0.0 && end_value == 0.0 {
                continue; // no exposure in the period
            }

            let rate = if end_value == 0.0 {
                // Position fully closed during the period.
                let denominator = start_value.abs() + outflows;
                if denominator == 0.0 {
                    warn!("return for {ticker} over [{from}, {to}] is undefined, omitting");
                    continue;
                }
                gain / denominator
            } else {
                let capital_at_risk = start_value + net_investment;
                if capital_at_risk == 0.0 {
                    warn!("zero capital at risk for {ticker} over [{from}, {to}], omitting");
                    continue;
                }
                gain / capital_at_risk.abs()
            };

            returns.insert(ticker, rate);
        }

        Ok(returns)
    }

    /// Benchmark return series: close prices reindexed to a daily calendar
    /// (forward- then backward-filled), each day expressed as
    /// price / first_price − 1.
    ///
    /// Errors with `DataFetch` when the feed has no data for the range at
    /// all, or when the first resolvable price is zero.
    pub async fn index_returns(
        &self,
        feed: &dyn FeedAdapter,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, LedgerError> {
        if from > to {
            return Err(LedgerError::Validation(format!(
                "invalid date range: {from} is after {to}"
            )));
        }

        let closes = feed.close_prices(symbol, from, to).await?;
        let last_close = closes.last().map(|p| p.date).ok_or_else(|| {
            LedgerError::DataFetch(format!(
                "no data for index {symbol} between {from} and {to}"
            ))
        })?;

        // Calendar clamped to the last trading day the feed covered.
        let end = to.min(last_close);

        let price_on = |date: NaiveDate| -> f64 {
            latest_at_or_before(&closes, date, |p| p.date)
                .or_else(|| closes.iter().find(|p| p.date > date))
                .map(|p| p.price)
                .unwrap_or(0.0)
        };

        let first_price = price_on(from);
        if first_price == 0.0 {
            return Err(LedgerError::DataFetch(format!(
                "index {symbol} has no usable starting price at {from}"
            )));
        }

        Ok(from
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| (d, price_on(d) / first_price - 1.0))
            .collect())
    }

    /// Point-in-time account snapshot: every open position marked to market,
    /// sorted by absolute value descending, plus cash and the total.
    pub fn summary(&self, store: &LedgerStore, date: NaiveDate, currency: &str) -> PortfolioSummary {
        let mut positions: Vec<PositionSummary> = store
            .holdings_as_of(date)
            .into_iter()
            .filter(|(_, shares)| *shares != 0)
            .map(|(ticker, shares)| {
                let price = store.price_as_of(&ticker, date).unwrap_or(0.0);
                PositionSummary {
                    value: shares as f64 * price,
                    ticker,
                    shares,
                    price,
                }
            })
            .collect();
        positions.sort_by(|a, b| {
            b.value
                .abs()
                .partial_cmp(&a.value.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        let cash = store.cash_as_of(date).unwrap_or(0.0);
        let total_value = positions.iter().map(|p| p.value).sum::<f64>() + cash;

        PortfolioSummary {
            date,
            currency: currency.to_string(),
            positions,
            cash,
            total_value,
        }
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
