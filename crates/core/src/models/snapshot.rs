use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one ticker's included lots on a snapshot date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Shares held across all included lots of this ticker
    pub shares: f64,

    /// Price used for the date (forward-filled when the exact date is missing)
    pub price: f64,

    /// shares × price
    pub market_value: f64,

    /// Sum of cost basis of the included lots
    pub cost_basis: f64,
}

impl Position {
    pub fn gain_loss(&self) -> f64 {
        self.market_value - self.cost_basis
    }
}

/// Computed portfolio state at the close of one date.
///
/// Derived on every refresh and never mutated after construction.
/// `total_value` is the sum of position market values and
/// `total_gain_loss = total_value - total_cost_basis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,

    /// Per-ticker breakdown, sorted by ticker
    pub positions: BTreeMap<String, Position>,

    pub total_value: f64,

    pub total_cost_basis: f64,

    pub total_gain_loss: f64,
}

impl PortfolioSnapshot {
    /// Build a snapshot from its positions; totals are derived.
    pub fn from_positions(date: NaiveDate, positions: BTreeMap<String, Position>) -> Self {
        let total_value = positions.values().map(|p| p.market_value).sum();
        let total_cost_basis = positions.values().map(|p| p.cost_basis).sum();
        Self {
            date,
            positions,
            total_value,
            total_cost_basis,
            total_gain_loss: total_value - total_cost_basis,
        }
    }

    /// Percentage return over cost basis, or 0 when nothing is invested.
    pub fn return_pct(&self) -> f64 {
        if self.total_cost_basis > 0.0 {
            self.total_gain_loss / self.total_cost_basis * 100.0
        } else {
            0.0
        }
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(&ticker.to_uppercase())
    }
}
