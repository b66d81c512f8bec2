use std::sync::Arc;

use portfolio_tracker_core::{models::settings::Settings, PortfolioTracker};
use tokio::sync::RwLock;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};

/// Shared server state: one tracker session for the lifetime of the process.
///
/// Valuation and listing handlers take the read lock; lot mutations take the
/// write lock.
pub struct AppState {
    pub tracker: RwLock<PortfolioTracker>,
}

impl AppState {
    pub fn new(tracker: PortfolioTracker) -> Arc<Self> {
        Arc::new(Self {
            tracker: RwLock::new(tracker),
        })
    }
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (json_layer, text_layer) = match format {
        LogFormat::Json => (Some(fmt::layer().json().with_current_span(false)), None),
        LogFormat::Text => (None, Some(fmt::layer())),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let mut settings = Settings {
        lookback_days: config.lookback_days,
        ..Settings::default()
    };
    if let Some(key) = &config.alphavantage_api_key {
        settings
            .api_keys
            .insert("alphavantage".to_string(), key.clone());
    }

    let tracker = PortfolioTracker::new(settings);
    tracing::info!(providers = ?tracker.provider_names(), "Price providers registered");
    AppState::new(tracker)
}
