use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default number of days fetched before the start of a valuation range,
/// so the first dates can forward-fill over weekends and holidays.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 10;

/// User-configurable settings for one tracker session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    /// Values: the API key string.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}
