use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire portfolio-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    // ── Valuation ───────────────────────────────────────────────────
    #[error("Invalid date range {start} to {end}: {reason}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("No price for {ticker} on or before {date}")]
    DataGap { ticker: String, date: NaiveDate },

    // ── Lots ────────────────────────────────────────────────────────
    #[error("Lot validation failed: {0}")]
    Validation(String),

    #[error("Lot not found: {0}")]
    LotNotFound(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No price provider configured")]
    NoProvider,

    // ── Export / Import ─────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// Errors the user can fix by correcting their input.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidRange { .. }
                | CoreError::UnknownTicker(_)
                | CoreError::Validation(_)
                | CoreError::LotNotFound(_)
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL, including the apikey query parameter.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
