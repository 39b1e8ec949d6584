use crate::errors::LedgerError;
use crate::models::transaction::{Transaction, TxnKind};

/// Which transaction kinds a log is allowed to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Buy / Sell / Short / Cover.
    #[default]
    Standard,
    /// Legacy two-value logs: Buy / Sell only.
    LegacyLongOnly,
}

impl ValidationMode {
    fn allows(self, kind: TxnKind) -> bool {
        match self {
            ValidationMode::Standard => true,
            ValidationMode::LegacyLongOnly => matches!(kind, TxnKind::Buy | TxnKind::Sell),
        }
    }
}

/// Validate a typed transaction log before any ledger is built.
///
/// All row errors are collected into a single `Validation` error so a bad
/// log reports every problem at once. An empty log is valid.
pub fn validate_transactions(
    transactions: &[Transaction],
    mode: ValidationMode,
) -> Result<(), LedgerError> {
    let mut errors = Vec::new();

    for (idx, txn) in transactions.iter().enumerate() {
        let row = idx + 1;

        if txn.ticker.trim().is_empty() {
            errors.push(format!("row {row}: empty ticker"));
        }
        if txn.amount == 0 {
            errors.push(format!("row {row}: amount must be positive"));
        }
        if let Some(price) = txn.price {
            if !price.is_finite() || price <= 0.0 {
                errors.push(format!("row {row}: price must be positive, got {price}"));
            }
        }
        if !mode.allows(txn.kind) {
            errors.push(format!(
                "row {row}: type {} not allowed (legacy logs accept Buy/Sell only)",
                txn.kind
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::Validation(errors.join("\n")))
    }
}

/// Initial cash must be a finite, non-negative amount.
pub fn validate_initial_cash(initial_cash: f64) -> Result<(), LedgerError> {
    if !initial_cash.is_finite() {
        return Err(LedgerError::Validation(format!(
            "initial cash must be a finite number, got {initial_cash}"
        )));
    }
    if initial_cash < 0.0 {
        return Err(LedgerError::Validation(format!(
            "initial cash cannot be negative, got {initial_cash}"
        )));
    }
    if initial_cash == 0.0 {
        log::warn!("initial cash is 0 — the account starts with no cash");
    }
    Ok(())
}

/// Currency codes are exactly 3 uppercase ASCII letters (e.g. USD, SEK).
pub fn validate_currency(currency: &str) -> Result<(), LedgerError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(LedgerError::Validation(format!(
            "invalid currency code '{currency}': expected 3 uppercase ASCII letters"
        )));
    }
    Ok(())
}
