use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::errors::CoreError;
use crate::models::analytics::{round_cents, HoldingRow, PortfolioStats};
use crate::models::chart::ValuationWarning;
use crate::models::lot::Lot;
use crate::models::price::PricePoint;
use crate::providers::traits::PriceSource;

/// Builds the holdings table and the summary statistics.
///
/// Current value uses the most recent close; invested is the lot's cost basis.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// One row per lot, priced at the latest close.
    ///
    /// Lots whose ticker cannot be priced are left out of the table and
    /// reported as warnings. One fetch per distinct ticker.
    pub async fn holdings_table(
        &self,
        lots: &[Lot],
        source: &dyn PriceSource,
    ) -> (Vec<HoldingRow>, Vec<ValuationWarning>) {
        let tickers: BTreeSet<&str> = lots.iter().map(Lot::ticker).collect();
        let quotes = join_all(tickers.into_iter().map(|ticker| async move {
            (ticker, source.latest_price(ticker).await)
        }))
        .await;

        let mut latest: BTreeMap<&str, PricePoint> = BTreeMap::new();
        let mut warnings = Vec::new();
        for (ticker, result) in quotes {
            match result {
                Ok(point) => {
                    latest.insert(ticker, point);
                }
                Err(CoreError::UnknownTicker(_)) => {
                    warn!(ticker, "Dropping holdings of unknown ticker");
                    warnings.push(ValuationWarning::UnknownTicker {
                        ticker: ticker.to_string(),
                    });
                }
                Err(e) => {
                    warn!(ticker, error = %e, "Dropping holdings without a current price");
                    warnings.push(ValuationWarning::PriceUnavailable {
                        ticker: ticker.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let rows = lots
            .iter()
            .filter_map(|lot| latest.get(lot.ticker()).map(|point| Self::row(lot, point.price)))
            .collect();
        (rows, warnings)
    }

    /// Table row for one lot at `current_price`.
    pub fn row(lot: &Lot, current_price: f64) -> HoldingRow {
        let current_value = lot.shares() * current_price;
        HoldingRow {
            lot_id: lot.id(),
            ticker: lot.ticker().to_string(),
            shares: lot.shares(),
            purchase_date: lot.purchase_date(),
            purchase_price: lot.purchase_price(),
            current_price,
            current_value,
            invested: lot.cost_basis(),
            gain_loss: current_value - lot.cost_basis(),
        }
    }

    /// Aggregate statistics over table rows.
    pub fn portfolio_stats(&self, rows: &[HoldingRow]) -> PortfolioStats {
        let total_value: f64 = rows.iter().map(|r| r.current_value).sum();
        let total_invested: f64 = rows.iter().map(|r| r.invested).sum();
        let total_gain_loss = total_value - total_invested;
        let gain_pct = if total_invested > 0.0 {
            total_gain_loss / total_invested * 100.0
        } else {
            0.0
        };

        PortfolioStats {
            holdings: rows.len(),
            total_value: round_cents(total_value),
            total_invested: round_cents(total_invested),
            total_gain_loss: round_cents(total_gain_loss),
            gain_pct,
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
