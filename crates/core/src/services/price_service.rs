use chrono::{Duration, NaiveDate};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;

use crate::errors::LedgerError;
use crate::feed::FeedAdapter;
use crate::models::holdings::HoldingsTable;
use crate::models::price::{PricePoint, PriceTable};
use crate::models::series::latest_at_or_before;
use crate::models::transaction::Transaction;

/// Extends the per-instrument daily price table in the base currency.
///
/// Two sources feed the table, in precedence order:
/// 1. explicit transaction prices (amount-weighted per day), forward-filled
///    one day so valuation works until market data resumes;
/// 2. market closes for every ownership period, FX-converted to base.
///
/// Existing points are never overwritten by market data, so repeated runs
/// are idempotent and explicit prices always win on conflicting dates.
pub struct PriceService;

impl PriceService {
    pub fn new() -> Self {
        Self
    }

    /// Extend `prices` from its last recorded date (or the holdings table's
    /// first date when empty) through `today`.
    ///
    /// Per-instrument feed failures and empty responses are logged and
    /// skipped; the only fatal condition is an empty holdings table, which
    /// means there is nothing to price yet.
    pub async fn extend(
        &self,
        feed: &dyn FeedAdapter,
        base_currency: &str,
        transactions: &[Transaction],
        holdings: &HoldingsTable,
        prices: &mut PriceTable,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        let first_holding_date = holdings.min_date().ok_or_else(|| {
            LedgerError::DataFetch(
                "cannot build price table: no holdings snapshots exist yet".into(),
            )
        })?;

        let window_start = prices
            .max_date()
            .map(|d| d + Duration::days(1))
            .unwrap_or(first_holding_date);

        if window_start > today {
            debug!("price table is up to date ({today})");
            return Ok(());
        }

        info!("updating prices in {base_currency} from {window_start} to {today}");

        self.apply_specified_prices(feed, base_currency, transactions, prices, today)
            .await;

        for ticker in holdings.instruments() {
            let periods = ownership_periods(holdings, &ticker, window_start, today);
            if periods.is_empty() {
                continue;
            }

            for (start, end) in merge_periods(periods) {
                if let Err(e) = self
                    .fill_period(feed, base_currency, &ticker, start, end, prices)
                    .await
                {
                    error!("price fill failed for {ticker} {start}..{end}: {e}");
                }
            }
        }

        info!("price table update complete ({} points)", prices.total_points());
        Ok(())
    }

    /// Step 1: explicit transaction prices. Amount-weighted per (instrument,
    /// day), converted to base currency, upserted (explicit prices take
    /// precedence) and forward-filled exactly one day into empty slots.
    async fn apply_specified_prices(
        &self,
        feed: &dyn FeedAdapter,
        base_currency: &str,
        transactions: &[Transaction],
        prices: &mut PriceTable,
        today: NaiveDate,
    ) {
        let specified = specified_prices(transactions);

        for (ticker, by_date) in specified {
            let currency = match feed.currency(&ticker).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("skipping specified prices for {ticker}: no trading currency ({e})");
                    continue;
                }
            };

            for (date, raw_price) in by_date {
                let base_price = if currency == base_currency {
                    raw_price
                } else {
                    match feed.fx_rates(&currency, base_currency, date, date).await {
                        Ok(rates) if !rates.is_empty() => raw_price * rates[0].price,
                        Ok(_) => {
                            warn!("no {currency}/{base_currency} rate on {date}, keeping {ticker} price unconverted");
                            raw_price
                        }
                        Err(e) => {
                            warn!("FX lookup failed for {ticker} on {date}, keeping price unconverted: {e}");
                            raw_price
                        }
                    }
                };

                if !base_price.is_finite() {
                    continue;
                }

                prices.insert(&ticker, date, base_price);

                // Bridge one day so valuation works before market data resumes.
                let next = date + Duration::days(1);
                if next <= today {
                    prices.insert_if_absent(&ticker, next, base_price);
                }
            }
        }
    }

    /// Step 3: market closes for one merged ownership period, converted to
    /// base currency, inserted only into empty (date, instrument) slots.
    async fn fill_period(
        &self,
        feed: &dyn FeedAdapter,
        base_currency: &str,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        prices: &mut PriceTable,
    ) -> Result<(), LedgerError> {
        let closes = feed.close_prices(ticker, start, end).await?;
        if closes.is_empty() {
            warn!("no market data for {ticker} between {start} and {end}");
            return Ok(());
        }

        let currency = feed.currency(ticker).await?;

        let converted = if currency == base_currency {
            closes
        } else {
            debug!("converting {ticker} closes from {currency} to {base_currency}");
            let rates = feed.fx_rates(&currency, base_currency, start, end).await?;
            convert_with_rates(&closes, &rates)
        };

        let mut inserted = 0usize;
        for point in converted {
            if point.price.is_finite() && prices.insert_if_absent(ticker, point.date, point.price)
            {
                inserted += 1;
            }
        }
        debug!("inserted {inserted} price points for {ticker} ({start}..{end})");
        Ok(())
    }
}

impl Default for PriceService {
    fn default() -> Self {
        Self::new()
    }
}

/// Amount-weighted explicit prices per (instrument, day), taken from
/// transactions that carry a price.
fn specified_prices(transactions: &[Transaction]) -> BTreeMap<String, BTreeMap<NaiveDate, f64>> {
    let mut sums: BTreeMap<String, BTreeMap<NaiveDate, (f64, f64)>> = BTreeMap::new();

    for txn in transactions {
        if let Some(price) = txn.price {
            let (shares, value) = sums
                .entry(txn.ticker.clone())
                .or_default()
                .entry(txn.date)
                .or_insert((0.0, 0.0));
            *shares += txn.amount as f64;
            *value += txn.amount as f64 * price;
        }
    }

    sums.into_iter()
        .map(|(ticker, by_date)| {
            let averaged = by_date
                .into_iter()
                .map(|(date, (shares, value))| (date, value / shares))
                .collect();
            (ticker, averaged)
        })
        .collect()
}

/// Date ranges during which `ticker` had a non-zero position (long or
/// short), each extended one day past the position's last snapshot to
/// capture the final valuation day, clamped to `[window_start, today]`.
fn ownership_periods(
    holdings: &HoldingsTable,
    ticker: &str,
    window_start: NaiveDate,
    today: NaiveDate,
) -> Vec<(NaiveDate, NaiveDate)> {
    let mut periods = Vec::new();

    for (i, row) in holdings.rows.iter().enumerate() {
        let held = row.positions.get(ticker).copied().unwrap_or(0);
        if held == 0 {
            continue;
        }

        // The snapshot stays in effect until the day before the next one.
        let in_effect_until = match holdings.rows.get(i + 1) {
            Some(next) => next.date - Duration::days(1),
            None => today,
        };

        let start = row.date.max(window_start);
        let end = (in_effect_until + Duration::days(1)).min(today);

        if start <= end {
            periods.push((start, end));
        }
    }

    periods
}

/// Merge adjacent or overlapping date ranges (gap ≤ 1 day) to minimize
/// feed calls. Input must be sorted by start date.
fn merge_periods(periods: Vec<(NaiveDate, NaiveDate)>) -> Vec<(NaiveDate, NaiveDate)> {
    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::new();

    for (start, end) in periods {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end + Duration::days(1) => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    merged
}

/// Convert close prices with an FX series aligned to the close calendar:
/// each close date takes the nearest prior rate, falling back to the next
/// available rate when the series starts later (forward- then
/// backward-fill). Closes with no usable rate at all are dropped.
fn convert_with_rates(closes: &[PricePoint], rates: &[PricePoint]) -> Vec<PricePoint> {
    closes
        .iter()
        .filter_map(|close| {
            let rate = latest_at_or_before(rates, close.date, |r| r.date)
                .or_else(|| rates.iter().find(|r| r.date > close.date))?;
            Some(PricePoint {
                date: close.date,
                price: close.price * rate.price,
            })
        })
        .collect()
}
