use thiserror::Error;

/// Unified error type for the entire portfolio-ledger-core library.
/// Every public function returns `Result<T, LedgerError>`.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Input / Business Logic ──────────────────────────────────────
    #[error("Transaction log validation failed: {0}")]
    Validation(String),

    #[error("Data fetch failed: {0}")]
    DataFetch(String),

    #[error("Price not available for {symbol} on {date}")]
    PriceNotAvailable { symbol: String, date: String },

    // ── Feed / Network ──────────────────────────────────────────────
    #[error("Feed error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    // ── Ledger store persistence ────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed — wrong password or corrupted file")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query strings from URLs embedded in reqwest errors before
        // they reach logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        LedgerError::Network(sanitized)
    }
}

impl From<aes_gcm::Error> for LedgerError {
    fn from(_: aes_gcm::Error) -> Self {
        LedgerError::Decryption
    }
}
