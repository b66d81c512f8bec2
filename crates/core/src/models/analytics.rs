use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the holdings table (one per lot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub lot_id: Uuid,

    pub ticker: String,

    pub shares: f64,

    pub purchase_date: NaiveDate,

    /// Cost basis per share
    pub purchase_price: f64,

    /// Most recent close
    pub current_price: f64,

    /// shares × current_price
    pub current_value: f64,

    /// Cost basis of the lot
    pub invested: f64,

    /// current_value - invested
    pub gain_loss: f64,
}

impl HoldingRow {
    /// Copy with monetary fields rounded to cents for display.
    pub fn rounded(&self) -> Self {
        Self {
            purchase_price: round_cents(self.purchase_price),
            current_price: round_cents(self.current_price),
            current_value: round_cents(self.current_value),
            invested: round_cents(self.invested),
            gain_loss: round_cents(self.gain_loss),
            ..self.clone()
        }
    }
}

/// Aggregate gain/loss statistics over the holdings table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Number of rows the stats were computed from
    pub holdings: usize,

    pub total_value: f64,

    pub total_invested: f64,

    /// total_value - total_invested
    pub total_gain_loss: f64,

    /// (total_gain_loss / total_invested) × 100, or 0 when nothing is invested
    pub gain_pct: f64,
}

impl std::fmt::Display for PortfolioStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.holdings == 0 {
            return write!(f, "No portfolio data yet.");
        }
        write!(
            f,
            "Total Portfolio Value: {} | Total Gain/Loss: {} ({:.2}%)",
            format_usd(self.total_value),
            format_usd(self.total_gain_loss),
            self.gain_pct
        )
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format as dollars with thousands separators, e.g. `$12,345.67` or `-$300.00`.
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
