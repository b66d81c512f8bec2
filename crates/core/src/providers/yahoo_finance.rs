use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;
use tracing::debug;

use super::traits::PriceSource;
use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries};

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance provider for stock/ETF closing prices.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's
/// public chart endpoints. Prices are in the listing currency.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// Yahoo answers an unknown symbol with a 404 on the chart endpoint.
    fn map_fetch_error(ticker: &str, err: &yahoo_finance_api::YahooError) -> CoreError {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("not found") || lower.contains("404") || lower.contains("no data found") {
            CoreError::UnknownTicker(ticker.to_string())
        } else {
            CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {ticker}: {message}"),
            }
        }
    }
}

#[async_trait]
impl PriceSource for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let day_after = to.succ_opt().ok_or_else(|| CoreError::InvalidRange {
            start: from,
            end: to,
            reason: "end date is out of the supported date range".into(),
        })?;
        let end = Self::to_offset_datetime(day_after)?; // inclusive end

        let resp = self
            .connector
            .get_quote_history(ticker, start, end)
            .await
            .map_err(|e| Self::map_fetch_error(ticker, &e))?;

        // A known symbol with no trading days in the window parses to no quotes.
        let quotes = match resp.quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                debug!(ticker, %from, %to, error = %e, "Yahoo returned no quotes");
                Vec::new()
            }
        };

        let points = quotes.iter().filter_map(|q| {
            let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
            (date >= from && date <= to).then(|| PricePoint::new(date, q.close))
        });

        Ok(PriceSeries::new(ticker, points))
    }

    async fn latest_price(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(ticker, "1d")
            .await
            .map_err(|e| Self::map_fetch_error(ticker, &e))?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {ticker}: {e}"),
        })?;

        let date = Self::timestamp_to_naive_date(quote.timestamp as i64).ok_or_else(|| {
            CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Invalid quote timestamp {} for {ticker}", quote.timestamp),
            }
        })?;

        Ok(PricePoint::new(date, quote.close))
    }
}
