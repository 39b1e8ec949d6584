use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of a recorded transaction.
///
/// Effect on the signed share count:
/// - `Buy` / `Cover`: inflow (+shares)
/// - `Sell` / `Short`: outflow (−shares; an open short is a negative count)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    Buy,
    Sell,
    Short,
    Cover,
}

impl TxnKind {
    /// True for kinds that increase the signed share count.
    pub fn is_inflow(self) -> bool {
        matches!(self, TxnKind::Buy | TxnKind::Cover)
    }
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxnKind::Buy => write!(f, "Buy"),
            TxnKind::Sell => write!(f, "Sell"),
            TxnKind::Short => write!(f, "Short"),
            TxnKind::Cover => write!(f, "Cover"),
        }
    }
}

impl std::str::FromStr for TxnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buy" => Ok(TxnKind::Buy),
            "Sell" => Ok(TxnKind::Sell),
            "Short" => Ok(TxnKind::Short),
            "Cover" => Ok(TxnKind::Cover),
            other => Err(format!(
                "unknown transaction type '{other}' (expected Buy/Sell/Short/Cover)"
            )),
        }
    }
}

/// A single recorded trade. The transaction log is append-only and is the
/// single source of truth for both holdings and cash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Trade date (daily granularity).
    pub date: NaiveDate,

    /// Instrument symbol, uppercased (e.g., "AAPL", "VOLV-B.ST").
    pub ticker: String,

    pub kind: TxnKind,

    /// Share count, always positive; the kind carries the sign.
    pub amount: u32,

    /// Explicit trade price in the instrument's own currency.
    /// `None` means "use the market close for that day".
    pub price: Option<f64>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        ticker: impl Into<String>,
        kind: TxnKind,
        amount: u32,
    ) -> Self {
        Self {
            date,
            ticker: ticker.into().to_uppercase(),
            kind,
            amount,
            price: None,
        }
    }

    /// A transaction carrying an explicit trade price.
    pub fn with_price(
        date: NaiveDate,
        ticker: impl Into<String>,
        kind: TxnKind,
        amount: u32,
        price: f64,
    ) -> Self {
        Self {
            date,
            ticker: ticker.into().to_uppercase(),
            kind,
            amount,
            price: Some(price),
        }
    }
}

/// Parse a semicolon-delimited transaction log.
///
/// Expected header: `Date;Ticker;Type;Amount;Price` — the Price column may be
/// missing entirely, and individual Price fields may be blank. Dates are
/// ISO-8601 (`YYYY-MM-DD`). Blank lines are skipped. Errors carry the 1-based
/// line number of the offending row.
pub fn parse_transaction_log(text: &str) -> Result<Vec<Transaction>, crate::errors::LedgerError> {
    use crate::errors::LedgerError;

    let mut lines = text.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => return Ok(Vec::new()),
        }
    };

    let columns: Vec<&str> = header.split(';').map(str::trim).collect();
    let col = |name: &str| columns.iter().position(|c| *c == name);

    let (date_col, ticker_col, kind_col, amount_col) =
        match (col("Date"), col("Ticker"), col("Type"), col("Amount")) {
            (Some(d), Some(t), Some(k), Some(a)) => (d, t, k, a),
            _ => {
                let missing: Vec<&str> = ["Date", "Ticker", "Type", "Amount"]
                    .into_iter()
                    .filter(|name| col(name).is_none())
                    .collect();
                return Err(LedgerError::Validation(format!(
                    "missing required columns: {}",
                    missing.join(", ")
                )));
            }
        };
    let price_col = col("Price");

    let mut transactions = Vec::new();

    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();

        let field = |col: usize| -> Result<&str, LedgerError> {
            fields.get(col).copied().ok_or_else(|| {
                LedgerError::Validation(format!("line {lineno}: too few fields"))
            })
        };

        let date = NaiveDate::parse_from_str(field(date_col)?, "%Y-%m-%d").map_err(|_| {
            LedgerError::Validation(format!(
                "line {lineno}: invalid date '{}' (expected YYYY-MM-DD)",
                fields[date_col]
            ))
        })?;

        let ticker = field(ticker_col)?;
        if ticker.is_empty() {
            return Err(LedgerError::Validation(format!(
                "line {lineno}: empty ticker"
            )));
        }

        let kind: TxnKind = field(kind_col)?
            .parse()
            .map_err(|e| LedgerError::Validation(format!("line {lineno}: {e}")))?;

        let amount: u32 = field(amount_col)?.parse().map_err(|_| {
            LedgerError::Validation(format!(
                "line {lineno}: invalid amount '{}' (expected a positive integer)",
                fields[amount_col]
            ))
        })?;

        let price = match price_col.and_then(|c| fields.get(c)) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<f64>().map_err(|_| {
                LedgerError::Validation(format!("line {lineno}: invalid price '{raw}'"))
            })?),
            _ => None,
        };

        transactions.push(Transaction {
            date,
            ticker: ticker.to_uppercase(),
            kind,
            amount,
            price,
        });
    }

    Ok(transactions)
}
