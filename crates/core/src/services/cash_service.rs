use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use std::collections::BTreeSet;

use crate::errors::LedgerError;
use crate::feed::FeedAdapter;
use crate::models::cash::CashSeries;
use crate::models::holdings::HoldingsTable;
use crate::models::price::PriceTable;
use crate::models::transaction::{Transaction, TxnKind};

/// One cash-moving event, merged from two sources before replay.
#[derive(Debug)]
enum CashEvent<'a> {
    Trade(&'a Transaction),
    Dividend {
        ticker: String,
        per_share: f64,
        shares: i64,
    },
}

/// Builds and incrementally extends the cash balance series.
///
/// Cash flow rules:
/// - Buy:   balance decreases (paying for shares)
/// - Sell:  balance increases (sale proceeds)
/// - Short: balance increases (short-sale proceeds, credited at open)
/// - Cover: balance decreases (cost of buying back)
/// - Dividend: balance increases, long positions only
///
/// The holdings table and price table must be current before this runs —
/// replay reads prices and dividend-date positions from them.
pub struct CashService;

impl CashService {
    pub fn new() -> Self {
        Self
    }

    /// Extend `cash` through `today`.
    ///
    /// Initial build (empty series): seeds one entry at the first
    /// transaction date minus one day with `initial_cash`; an empty log is a
    /// no-op, not an error. Incremental update: resumes from the latest
    /// stored entry and replays only events strictly after it, so one full
    /// pass and a split pass produce identical series.
    pub async fn extend(
        &self,
        feed: &dyn FeedAdapter,
        base_currency: &str,
        initial_cash: f64,
        transactions: &[Transaction],
        holdings: &HoldingsTable,
        prices: &PriceTable,
        cash: &mut CashSeries,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        let (last_date, mut balance) = match cash.last() {
            Some(entry) => {
                info!(
                    "updating cash ledger from {} (balance {:.2} {base_currency})",
                    entry.date, entry.balance
                );
                (entry.date, entry.balance)
            }
            None => {
                let first_txn_date = match transactions.iter().map(|t| t.date).min() {
                    Some(d) => d,
                    None => {
                        debug!("cash ledger: empty transaction log, nothing to seed");
                        return Ok(());
                    }
                };
                let seed_date = first_txn_date - Duration::days(1);
                cash.upsert(seed_date, initial_cash);
                info!(
                    "seeding cash ledger at {seed_date} with {initial_cash:.2} {base_currency}"
                );
                (seed_date, initial_cash)
            }
        };

        // Clamp to `today` so a resumed build replays exactly the events a
        // one-pass build would have seen.
        let mut events: Vec<(NaiveDate, CashEvent)> = transactions
            .iter()
            .filter(|t| t.date > last_date && t.date <= today)
            .map(|t| (t.date, CashEvent::Trade(t)))
            .collect();

        self.collect_dividend_events(feed, holdings, last_date, today, &mut events)
            .await;

        // Stable sort: trades stay ahead of dividends on shared dates.
        events.sort_by_key(|(date, _)| *date);

        if events.is_empty() {
            debug!("cash ledger: no new events to process");
            return Ok(());
        }

        let mut processed = 0usize;
        for (date, event) in events {
            match event {
                CashEvent::Trade(txn) => {
                    let Some(price) = prices.price_as_of(&txn.ticker, date) else {
                        warn!(
                            "no price for {} on {date}, skipping {} transaction",
                            txn.ticker, txn.kind
                        );
                        continue;
                    };
                    let value = txn.amount as f64 * price;
                    match txn.kind {
                        TxnKind::Buy | TxnKind::Cover => balance -= value,
                        TxnKind::Sell | TxnKind::Short => balance += value,
                    }
                    debug!(
                        "{date} {} {} x{} @ {price:.2} → balance {balance:.2}",
                        txn.kind, txn.ticker, txn.amount
                    );
                }
                CashEvent::Dividend {
                    ticker,
                    per_share,
                    shares,
                } => {
                    let Some(credit) = self
                        .dividend_credit(feed, base_currency, &ticker, per_share, shares, date)
                        .await
                    else {
                        continue;
                    };
                    balance += credit;
                    debug!(
                        "{date} dividend {ticker} {shares} x {per_share:.4} → +{credit:.2}"
                    );
                }
            }

            cash.upsert(date, balance);
            processed += 1;
        }

        info!("cash ledger updated: {processed} events, final balance {balance:.2} {base_currency}");
        Ok(())
    }

    /// Emit a dividend event for every payout date on which the instrument
    /// was held strictly long. Short positions never receive credit. Feed
    /// failures are per-instrument and non-fatal.
    async fn collect_dividend_events<'a>(
        &self,
        feed: &dyn FeedAdapter,
        holdings: &HoldingsTable,
        last_date: NaiveDate,
        today: NaiveDate,
        events: &mut Vec<(NaiveDate, CashEvent<'a>)>,
    ) {
        if last_date + Duration::days(1) > today {
            return;
        }

        // Instruments long at the resume point or at any snapshot after it.
        let mut candidates: BTreeSet<String> = holdings
            .positions_as_of(last_date)
            .into_iter()
            .filter(|(_, shares)| *shares > 0)
            .map(|(ticker, _)| ticker)
            .collect();
        for row in holdings.rows.iter().filter(|r| r.date > last_date) {
            for (ticker, shares) in &row.positions {
                if *shares > 0 {
                    candidates.insert(ticker.clone());
                }
            }
        }

        for ticker in candidates {
            let dividends = match feed
                .dividends(&ticker, last_date + Duration::days(1), today)
                .await
            {
                Ok(points) => points,
                Err(e) => {
                    warn!("could not fetch dividends for {ticker}: {e}");
                    continue;
                }
            };

            for point in dividends {
                let shares = holdings.shares_as_of(&ticker, point.date);
                if shares > 0 {
                    events.push((
                        point.date,
                        CashEvent::Dividend {
                            ticker: ticker.clone(),
                            per_share: point.amount,
                            shares,
                        },
                    ));
                }
            }
        }
    }

    /// Dividend cash credit in the base currency, or `None` when the event
    /// cannot be processed (logged and skipped — the replay loop continues).
    async fn dividend_credit(
        &self,
        feed: &dyn FeedAdapter,
        base_currency: &str,
        ticker: &str,
        per_share: f64,
        shares: i64,
        date: NaiveDate,
    ) -> Option<f64> {
        let total = per_share * shares as f64;

        let currency = match feed.currency(ticker).await {
            Ok(c) => c,
            Err(e) => {
                warn!("skipping dividend for {ticker} on {date}: no trading currency ({e})");
                return None;
            }
        };

        if currency == base_currency {
            return Some(total);
        }

        match feed.fx_rates(&currency, base_currency, date, date).await {
            Ok(rates) if !rates.is_empty() => Some(total * rates[0].price),
            Ok(_) => {
                warn!("no {currency}/{base_currency} rate on {date}, crediting {ticker} dividend unconverted");
                Some(total)
            }
            Err(e) => {
                warn!("skipping dividend for {ticker} on {date}: FX lookup failed ({e})");
                None
            }
        }
    }
}

impl Default for CashService {
    fn default() -> Self {
        Self::new()
    }
}
