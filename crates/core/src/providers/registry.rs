use tracing::warn;

use crate::models::settings::Settings;

use super::alphavantage::AlphaVantageProvider;
use super::traits::PriceSource;
use super::yahoo_finance::YahooFinanceProvider;

/// Ordered list of price providers.
///
/// Registration order is priority order: `PriceService` asks the first
/// provider, then falls back to the next one on failure.
pub struct PriceProviderRegistry {
    providers: Vec<Box<dyn PriceSource>>,
}

impl PriceProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: no API key needed (primary)
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => warn!(error = %e, "Yahoo Finance provider unavailable"),
        }

        // Alpha Vantage: requires API key (fallback)
        if let Some(key) = settings.api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        registry
    }

    /// Register a new price provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn PriceSource>) {
        self.providers.push(provider);
    }

    /// All providers in priority order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn PriceSource> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl Default for PriceProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
