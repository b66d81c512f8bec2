use crate::models::chart::ChartDataPoint;
use crate::models::snapshot::PortfolioSnapshot;

/// Turns snapshots into chart-ready points.
///
/// The core computes all the numbers; the frontend only renders.
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// One point per snapshot: total value plus per-ticker market value.
    pub fn chart_points(&self, snapshots: &[PortfolioSnapshot]) -> Vec<ChartDataPoint> {
        snapshots
            .iter()
            .map(|snapshot| ChartDataPoint {
                date: snapshot.date,
                total_value: snapshot.total_value,
                per_ticker: snapshot
                    .positions
                    .iter()
                    .map(|(ticker, position)| (ticker.clone(), position.market_value))
                    .collect(),
            })
            .collect()
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
