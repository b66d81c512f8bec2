use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries};

/// Abstraction over every market-data backend.
///
/// Each API provider (Yahoo Finance, Alpha Vantage) implements this trait,
/// and so does `PriceService`, which layers provider fallback on top. The
/// valuation engine only ever sees this contract, never a wire format.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closing prices for `ticker` in `[from, to]`, ascending by date.
    ///
    /// Fails with `CoreError::UnknownTicker` when the symbol cannot be resolved
    /// at all. A known ticker with no trading days in the range returns an
    /// empty series.
    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError>;

    /// The most recent close for `ticker`.
    async fn latest_price(&self, ticker: &str) -> Result<PricePoint, CoreError>;
}
