use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::traits::PriceSource;
use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// The compact output covers roughly the last 100 trading days.
const COMPACT_WINDOW_DAYS: i64 = 140;

/// Alpha Vantage API provider for stock/equity prices.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
///
/// Registered after Yahoo Finance, so it only serves as a fallback.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the provider at another endpoint (a proxy or a local stub).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: base_url.into(),
        }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

/// Turn a parsed daily time series into a price series restricted to `[from, to]`.
fn series_from_response(
    ticker: &str,
    resp: TimeSeriesResponse,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PriceSeries, CoreError> {
    if resp.error_message.is_some() {
        // Alpha Vantage reports unknown symbols as "Invalid API call".
        return Err(CoreError::UnknownTicker(ticker.to_string()));
    }
    let time_series = resp.time_series.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: resp.note.or(resp.information).unwrap_or_else(|| {
            format!("No time series data for {ticker}. API limit may be exceeded.")
        }),
    })?;

    let points = time_series.iter().filter_map(|(date_str, data)| {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
        if date < from || date > to {
            return None;
        }
        let price: f64 = data.close.parse().ok()?;
        Some(PricePoint::new(date, price))
    });

    Ok(PriceSeries::new(ticker, points))
}

/// Parse a raw `TIME_SERIES_DAILY` body. Exposed for offline tests.
pub fn parse_time_series(
    ticker: &str,
    body: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PriceSeries, CoreError> {
    let resp: TimeSeriesResponse = serde_json::from_str(body)?;
    series_from_response(ticker, resp, from, to)
}

#[async_trait]
impl PriceSource for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let output_size = if (today - from).num_days() <= COMPACT_WINDOW_DAYS {
            "compact"
        } else {
            "full"
        };
        debug!(ticker, output_size, "Requesting Alpha Vantage daily series");

        let resp: TimeSeriesResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &ticker.to_uppercase()),
                ("outputsize", output_size),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {ticker}: {e}"),
            })?;

        series_from_response(ticker, resp, from, to)
    }

    async fn latest_price(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        let resp: GlobalQuoteResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", &ticker.to_uppercase()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse quote for {ticker}: {e}"),
            })?;

        if resp.error_message.is_some() {
            return Err(CoreError::UnknownTicker(ticker.to_string()));
        }

        let quote = resp.global_quote.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {ticker}. API limit may be exceeded."),
        })?;

        // An unknown symbol comes back as an empty "Global Quote" object.
        let price_str = quote
            .price
            .ok_or_else(|| CoreError::UnknownTicker(ticker.to_string()))?;
        let price: f64 = price_str.parse().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid price format for {ticker}: {e}"),
        })?;
        let date = quote
            .latest_trading_day
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            .unwrap_or_else(today_utc);

        Ok(PricePoint::new(date, price))
    }
}

fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
