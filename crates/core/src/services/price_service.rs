use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::{PricePoint, PriceSeries};
use crate::providers::registry::PriceProviderRegistry;
use crate::providers::traits::PriceSource;

/// Fetches prices from the registered providers with automatic fallback.
///
/// Providers are tried in registration order. An `UnknownTicker` answer from
/// one provider is not final: another provider may list the symbol. Only when
/// every provider says the ticker is unknown is `UnknownTicker` returned;
/// otherwise the last real failure (API down, rate limited, ...) surfaces.
///
/// **Note on precision**: All prices are `f64`, which has ~15-17 significant
/// decimal digits. Sums over many lots may accumulate small rounding errors.
pub struct PriceService {
    registry: PriceProviderRegistry,
}

impl PriceService {
    pub fn new(registry: PriceProviderRegistry) -> Self {
        Self { registry }
    }

    /// Check if at least one provider is registered.
    pub fn has_provider(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Get the names of all providers in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    fn validate_price(
        provider: &str,
        ticker: &str,
        point: PricePoint,
    ) -> Result<PricePoint, CoreError> {
        if !point.price.is_finite() || point.price < 0.0 {
            return Err(CoreError::Api {
                provider: provider.to_string(),
                message: format!(
                    "Invalid price returned for {ticker}: {} (must be finite and non-negative)",
                    point.price
                ),
            });
        }
        Ok(point)
    }
}

/// Fold one provider failure into the running fallback state.
///
/// `UnknownTicker` only wins when nothing better was seen.
fn record_failure(
    last_error: &mut Option<CoreError>,
    provider: &str,
    ticker: &str,
    err: CoreError,
) {
    match err {
        CoreError::UnknownTicker(_) => {
            debug!(provider, ticker, "Provider does not know ticker");
            if last_error.is_none() {
                *last_error = Some(err);
            }
        }
        other => {
            warn!(provider, ticker, error = %other, "Price provider failed, trying next");
            *last_error = Some(other);
        }
    }
}

#[async_trait]
impl PriceSource for PriceService {
    fn name(&self) -> &str {
        "PriceService"
    }

    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            match provider.price_series(ticker, from, to).await {
                Ok(series) => {
                    debug!(
                        provider = provider.name(),
                        ticker,
                        %from,
                        %to,
                        points = series.len(),
                        "Fetched price series"
                    );
                    return Ok(series);
                }
                Err(e) => record_failure(&mut last_error, provider.name(), ticker, e),
            }
        }

        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn latest_price(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            let result = provider
                .latest_price(ticker)
                .await
                .and_then(|point| Self::validate_price(provider.name(), ticker, point));
            match result {
                Ok(point) => return Ok(point),
                Err(e) => record_failure(&mut last_error, provider.name(), ticker, e),
            }
        }

        Err(last_error.unwrap_or(CoreError::NoProvider))
    }
}
