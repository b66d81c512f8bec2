use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// Purchase dates before this year are rejected.
pub const EARLIEST_PURCHASE_YEAR: i32 = 1900;

/// One purchase of a ticker.
///
/// Immutable once created: fields are private and only exposed through
/// accessors. A lot always carries a resolved cost basis; use [`NewLot`]
/// at the input boundary when the cost basis still has to be derived
/// from the purchase-day price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LotRecord")]
pub struct Lot {
    id: Uuid,
    ticker: String,
    shares: f64,
    purchase_date: NaiveDate,
    cost_basis: f64,
}

impl Lot {
    /// Create a lot from already-validated parts.
    ///
    /// The ticker is normalized (trimmed, uppercased). Shares must be positive
    /// and the cost basis non-negative; both must be finite. The purchase date
    /// must not precede `EARLIEST_PURCHASE_YEAR`.
    pub fn new(
        ticker: impl AsRef<str>,
        shares: f64,
        purchase_date: NaiveDate,
        cost_basis: f64,
    ) -> Result<Self, CoreError> {
        let ticker = normalize_ticker(ticker.as_ref())?;
        validate_shares(shares)?;
        validate_purchase_date(purchase_date)?;
        validate_cost_basis(cost_basis)?;
        Ok(Self {
            id: Uuid::new_v4(),
            ticker,
            shares,
            purchase_date,
            cost_basis,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn shares(&self) -> f64 {
        self.shares
    }

    pub fn purchase_date(&self) -> NaiveDate {
        self.purchase_date
    }

    pub fn cost_basis(&self) -> f64 {
        self.cost_basis
    }

    /// Cost basis divided by share count.
    pub fn purchase_price(&self) -> f64 {
        self.cost_basis / self.shares
    }

    /// Whether this lot is held at the close of `date`.
    pub fn is_held_on(&self, date: NaiveDate) -> bool {
        self.purchase_date <= date
    }
}

/// Wire shape of a lot; deserialization goes through the same checks as `Lot::new`.
#[derive(Deserialize)]
struct LotRecord {
    id: Uuid,
    ticker: String,
    shares: f64,
    purchase_date: NaiveDate,
    cost_basis: f64,
}

impl TryFrom<LotRecord> for Lot {
    type Error = CoreError;

    fn try_from(record: LotRecord) -> Result<Self, Self::Error> {
        let lot = Lot::new(
            record.ticker,
            record.shares,
            record.purchase_date,
            record.cost_basis,
        )?;
        Ok(Self { id: record.id, ..lot })
    }
}

/// Raw lot input as entered in the form.
///
/// `cost_basis: None` means "derive it from the purchase-day close".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLot {
    pub ticker: String,
    pub shares: f64,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

impl NewLot {
    pub fn new(ticker: impl Into<String>, shares: f64, purchase_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            shares,
            purchase_date,
            cost_basis: None,
        }
    }

    pub fn with_cost_basis(mut self, cost_basis: f64) -> Self {
        self.cost_basis = Some(cost_basis);
        self
    }

    /// Check the input against the form rules. Returns the normalized ticker.
    ///
    /// Rules:
    /// - Ticker is non-empty and made of ASCII letters, digits, `.`, `-`, `^`, `=`
    /// - Shares are positive and finite
    /// - Purchase date is not after `today` nor before `EARLIEST_PURCHASE_YEAR`
    /// - An explicit cost basis is non-negative and finite
    pub fn validate(&self, today: NaiveDate) -> Result<String, CoreError> {
        let ticker = normalize_ticker(&self.ticker)?;
        validate_shares(self.shares)?;
        validate_purchase_date(self.purchase_date)?;
        if self.purchase_date > today {
            return Err(CoreError::Validation(format!(
                "Purchase date {} is in the future",
                self.purchase_date
            )));
        }
        if let Some(cost_basis) = self.cost_basis {
            validate_cost_basis(cost_basis)?;
        }
        Ok(ticker)
    }
}

fn normalize_ticker(raw: &str) -> Result<String, CoreError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(CoreError::Validation("Ticker must not be empty".into()));
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(CoreError::Validation(format!(
            "Ticker '{ticker}' contains invalid character '{bad}'"
        )));
    }
    Ok(ticker)
}

fn validate_shares(shares: f64) -> Result<(), CoreError> {
    if !shares.is_finite() || shares <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Share count must be a positive number, got {shares}"
        )));
    }
    Ok(())
}

fn validate_purchase_date(date: NaiveDate) -> Result<(), CoreError> {
    if date.year() < EARLIEST_PURCHASE_YEAR {
        return Err(CoreError::Validation(format!(
            "Purchase date {date} is before {EARLIEST_PURCHASE_YEAR}-01-01"
        )));
    }
    Ok(())
}

fn validate_cost_basis(cost_basis: f64) -> Result<(), CoreError> {
    if !cost_basis.is_finite() || cost_basis < 0.0 {
        return Err(CoreError::Validation(format!(
            "Cost basis must be a non-negative amount, got {cost_basis}"
        )));
    }
    Ok(())
}
