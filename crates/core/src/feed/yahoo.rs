use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use crate::errors::LedgerError;
use crate::models::price::{DividendPoint, PricePoint};

use super::adapter::{CurrencyCache, FeedAdapter};
use super::fx::FrankfurterFx;

/// Live market-data feed.
///
/// Close prices, dividend events, and the instrument's trading currency come
/// from Yahoo Finance (unofficial public API, no key). FX rates come from
/// Frankfurter, since Yahoo's synthetic FX tickers have spotty histories for
/// minor pairs. Trading currencies are cached per symbol for the process
/// lifetime — Yahoo never changes them mid-run.
pub struct YahooMarketFeed {
    connector: yahoo_finance_api::YahooConnector,
    fx: FrankfurterFx,
    currencies: CurrencyCache,
}

impl YahooMarketFeed {
    pub fn new() -> Result<Self, LedgerError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| LedgerError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self {
            connector,
            fx: FrankfurterFx::new(),
            currencies: CurrencyCache::new(),
        })
    }

    /// Drop all cached per-symbol currencies.
    pub fn clear_currency_cache(&self) {
        self.currencies.clear();
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, LedgerError> {
        let month = time::Month::try_from(date.month() as u8).map_err(|e| LedgerError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Invalid month in {date}: {e}"),
        })?;

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| LedgerError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Invalid date {date}: {e}"),
            })?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    async fn quote_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<yahoo_finance_api::YResponse, LedgerError> {
        let start = Self::to_offset_datetime(from)?;
        // Yahoo treats the end as exclusive
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?;

        self.connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| LedgerError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })
    }
}

#[async_trait]
impl FeedAdapter for YahooMarketFeed {
    fn name(&self) -> &str {
        "Yahoo Finance + Frankfurter"
    }

    async fn close_prices(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        let resp = self.quote_history(symbol, from, to).await?;

        let quotes = resp.quotes().map_err(|e| LedgerError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                if date >= from && date <= to && q.close.is_finite() {
                    Some(PricePoint {
                        date,
                        price: q.close,
                    })
                } else {
                    None
                }
            })
            .collect();

        Ok(points)
    }

    async fn dividends(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DividendPoint>, LedgerError> {
        let resp = self.quote_history(symbol, from, to).await?;

        // A history window with no payout is an empty list, not an error.
        let dividends = match resp.dividends() {
            Ok(divs) => divs,
            Err(_) => return Ok(Vec::new()),
        };

        let mut points: Vec<DividendPoint> = dividends
            .iter()
            .filter_map(|d| {
                let date = Self::timestamp_to_naive_date(d.date as i64)?;
                if date >= from && date <= to {
                    Some(DividendPoint {
                        date,
                        amount: d.amount,
                    })
                } else {
                    None
                }
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    async fn currency(&self, symbol: &str) -> Result<String, LedgerError> {
        if let Some(cached) = self.currencies.get(symbol) {
            return Ok(cached);
        }

        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| LedgerError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch quote metadata for {symbol}: {e}"),
            })?;

        let meta = resp.metadata().map_err(|e| LedgerError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("No metadata for {symbol}: {e}"),
        })?;

        let currency = meta
            .currency
            .ok_or_else(|| LedgerError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("No trading currency reported for {symbol}"),
            })?
            .to_uppercase();

        self.currencies.insert(symbol, &currency);
        Ok(currency)
    }

    async fn fx_rates(
        &self,
        from_ccy: &str,
        to_ccy: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        self.fx.rates(from_ccy, to_ccy, from, to).await
    }
}
