use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::analytics::{HoldingRow, PortfolioStats};
use super::snapshot::PortfolioSnapshot;

/// A single data point for the portfolio value chart.
///
/// The core generates these; the frontend just renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub date: NaiveDate,

    /// Total portfolio value at this date
    pub total_value: f64,

    /// Market value per ticker at this date
    pub per_ticker: BTreeMap<String, f64>,
}

/// A problem that left part of the portfolio out of the results without
/// failing the whole render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValuationWarning {
    /// The price source could not resolve the ticker; its lots were skipped.
    UnknownTicker { ticker: String },

    /// No price on or before `date`; the ticker's lots were left out of that
    /// date (and any earlier ones).
    DataGap { ticker: String, date: NaiveDate },

    /// Fetching prices failed for another reason; its lots were skipped.
    PriceUnavailable { ticker: String, message: String },
}

impl std::fmt::Display for ValuationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationWarning::UnknownTicker { ticker } => {
                write!(f, "Unknown ticker {ticker}: its lots were skipped")
            }
            ValuationWarning::DataGap { ticker, date } => {
                write!(
                    f,
                    "No price for {ticker} on or before {date}: \
                     excluded until data is available"
                )
            }
            ValuationWarning::PriceUnavailable { ticker, message } => {
                write!(f, "Prices for {ticker} unavailable: {message}")
            }
        }
    }
}

/// Snapshots plus the warnings collected while computing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub snapshots: Vec<PortfolioSnapshot>,
    pub warnings: Vec<ValuationWarning>,
}

/// Everything one dashboard render needs: chart, table, stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub chart: Vec<ChartDataPoint>,

    pub table: Vec<HoldingRow>,

    pub stats: PortfolioStats,

    /// Rendered stats line, e.g. "Total Portfolio Value: $1,800.00 | ..."
    pub summary: String,

    pub warnings: Vec<ValuationWarning>,
}
