use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::LedgerError;
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter FX rate source (ECB data, no API key).
///
/// Endpoints used: `/{date}` for a single day, `/{start}..{end}` for a
/// time series. Rates come back relative to the requested base currency.
pub struct FrankfurterFx {
    client: Client,
}

impl FrankfurterFx {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Daily rates for `from_ccy` → `to_ccy` over an inclusive range.
    /// A same-currency pair short-circuits to a flat 1.0 series without a
    /// network call. ECB publishes business days only, so the result has
    /// gaps on weekends/holidays; callers forward/backward-fill.
    pub async fn rates(
        &self,
        from_ccy: &str,
        to_ccy: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        let base = from_ccy.to_uppercase();
        let target = to_ccy.to_uppercase();

        if base == target {
            return Ok(flat_series(from, to));
        }

        let url = format!(
            "{BASE_URL}/{}..{}?base={base}&symbols={target}",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
        );

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse time series for {base}/{target}: {e}"),
            })?;

        let mut points: Vec<PricePoint> = resp
            .rates
            .iter()
            .filter_map(|(date_str, rates)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                let rate = rates.get(&target)?;
                Some(PricePoint { date, price: *rate })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl Default for FrankfurterFx {
    fn default() -> Self {
        Self::new()
    }
}

fn flat_series(from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
    let mut points = Vec::new();
    let mut d = from;
    while d <= to {
        points.push(PricePoint { date: d, price: 1.0 });
        match d.succ_opt() {
            Some(next) => d = next,
            None => break,
        }
    }
    points
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    rates: HashMap<String, HashMap<String, f64>>,
}
