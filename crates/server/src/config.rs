use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{bail, Context};
use portfolio_tracker_core::models::settings::DEFAULT_LOOKBACK_DAYS;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8050";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{other}', expected 'text' or 'json'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub alphavantage_api_key: Option<String>,
    pub static_dir: String,
    pub request_timeout: Duration,
    pub lookback_days: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8050)),
            alphavantage_api_key: None,
            static_dir: default_static_dir(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Read `PT_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = var_or("PT_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)
            .parse()
            .context("Invalid PT_LISTEN_ADDR")?;
        let alphavantage_api_key = std::env::var("PT_ALPHAVANTAGE_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let static_dir = std::env::var("PT_STATIC_DIR").unwrap_or_else(|_| default_static_dir());
        let timeout_ms: u64 = var_or("PT_REQUEST_TIMEOUT_MS", &DEFAULT_TIMEOUT_MS.to_string())
            .parse()
            .context("Invalid PT_REQUEST_TIMEOUT_MS")?;
        let lookback_days: u32 = var_or("PT_LOOKBACK_DAYS", &DEFAULT_LOOKBACK_DAYS.to_string())
            .parse()
            .context("Invalid PT_LOOKBACK_DAYS")?;
        let log_format: LogFormat = var_or("PT_LOG_FORMAT", "text")
            .parse()
            .context("Invalid PT_LOG_FORMAT")?;

        Ok(Self {
            listen_addr,
            alphavantage_api_key,
            static_dir,
            request_timeout: Duration::from_millis(timeout_ms),
            lookback_days,
            log_format,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn default_static_dir() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string()
}
