pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use chrono::NaiveDate;
use models::{
    analytics::{HoldingRow, PortfolioStats},
    chart::{Dashboard, ValuationReport, ValuationWarning},
    lot::{Lot, NewLot},
    settings::Settings,
    snapshot::PortfolioSnapshot,
};
use providers::registry::PriceProviderRegistry;
use services::{
    analytics_service::AnalyticsService,
    chart_service::ChartService,
    portfolio_service::{LotBook, PortfolioService},
    price_service::PriceService,
    valuation_service::{Granularity, ValuationEngine, ValuationOptions},
};
use uuid::Uuid;

use errors::CoreError;

/// Maximum chart date range in days (10 years).
pub const MAX_CHART_RANGE_DAYS: i64 = 3650;

/// Main entry point for the Portfolio Tracker core library.
/// Holds the session lot list and all services needed to value it.
#[must_use]
pub struct PortfolioTracker {
    book: LotBook,
    settings: Settings,
    price_service: PriceService,
    portfolio_service: PortfolioService,
    analytics_service: AnalyticsService,
    chart_service: ChartService,
    engine: ValuationEngine,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("lots", &self.book.len())
            .field("lookback_days", &self.settings.lookback_days)
            .field("providers", &self.price_service.provider_names())
            .finish()
    }
}

impl PortfolioTracker {
    /// Create an empty session with the default providers for `settings`.
    pub fn new(settings: Settings) -> Self {
        let registry = PriceProviderRegistry::new_with_defaults(&settings);
        Self::build(settings, registry)
    }

    /// Create an empty session backed by a custom provider registry.
    pub fn with_registry(settings: Settings, registry: PriceProviderRegistry) -> Self {
        Self::build(settings, registry)
    }

    // ── Lot Management ──────────────────────────────────────────────

    /// Validate form input and add the lot, deriving its cost basis from the
    /// purchase-day close when none was given.
    pub async fn add_lot(&mut self, input: NewLot) -> Result<Lot, CoreError> {
        self.add_lot_as_of(input, today()).await
    }

    /// `add_lot` with an explicit "today" for the future-date check.
    pub async fn add_lot_as_of(
        &mut self,
        input: NewLot,
        today: NaiveDate,
    ) -> Result<Lot, CoreError> {
        self.portfolio_service
            .add_lot(&mut self.book, &input, &self.price_service, today)
            .await
    }

    /// Validate form input and derive its cost basis without adding it.
    ///
    /// Pair with [`insert_lot`](Self::insert_lot) when the price lookup
    /// should not hold exclusive access to the session.
    pub async fn resolve_lot(&self, input: &NewLot) -> Result<Lot, CoreError> {
        self.portfolio_service
            .resolve_lot(input, &self.price_service, today())
            .await
    }

    /// Append a lot returned by [`resolve_lot`](Self::resolve_lot).
    pub fn insert_lot(&mut self, lot: Lot) {
        self.portfolio_service.insert_lot(&mut self.book, lot);
    }

    /// Add multiple lots at once. If any input fails, none are added.
    pub async fn add_lots(&mut self, inputs: &[NewLot]) -> Result<Vec<Lot>, CoreError> {
        self.portfolio_service
            .add_lots(&mut self.book, inputs, &self.price_service, today())
            .await
    }

    /// Remove a lot by its id.
    pub fn remove_lot(&mut self, id: Uuid) -> Result<Lot, CoreError> {
        self.portfolio_service.remove_lot(&mut self.book, id)
    }

    /// Remove every lot.
    pub fn clear_lots(&mut self) {
        self.portfolio_service.clear(&mut self.book);
    }

    #[must_use]
    pub fn lots(&self) -> &[Lot] {
        self.book.lots()
    }

    #[must_use]
    pub fn get_lot(&self, id: Uuid) -> Option<&Lot> {
        self.book.get(id)
    }

    /// Distinct tickers held, sorted.
    #[must_use]
    pub fn tickers(&self) -> Vec<&str> {
        self.book.tickers()
    }

    #[must_use]
    pub fn earliest_purchase_date(&self) -> Option<NaiveDate> {
        self.book.earliest_purchase_date()
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Portfolio snapshots for every trading day in `[start, end]`.
    ///
    /// Strict: fails on an unknown ticker or a data gap.
    pub async fn compute_timeseries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioSnapshot>, CoreError> {
        check_chart_range(start, end)?;
        self.engine
            .compute_timeseries(self.book.lots(), &self.price_service, start, end)
            .await
    }

    /// Snapshots with unknown tickers and gaps reported as warnings.
    pub async fn valuation_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ValuationReport, CoreError> {
        check_chart_range(start, end)?;
        self.engine
            .compute_report(self.book.lots(), &self.price_service, start, end)
            .await
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// One row per lot at the latest close, plus warnings for lots that
    /// could not be priced.
    pub async fn holdings_table(&self) -> (Vec<HoldingRow>, Vec<ValuationWarning>) {
        self.analytics_service
            .holdings_table(self.book.lots(), &self.price_service)
            .await
    }

    /// Total value, invested amount and gain/loss at the latest close.
    pub async fn stats(&self) -> PortfolioStats {
        let (rows, _) = self.holdings_table().await;
        self.analytics_service.portfolio_stats(&rows)
    }

    /// Everything one render needs: chart over `[start, end]`, holdings
    /// table, stats and all warnings. Only a bad range fails.
    pub async fn dashboard(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Dashboard, CoreError> {
        let report = self.valuation_report(start, end).await?;
        let (rows, table_warnings) = self.holdings_table().await;
        let stats = self.analytics_service.portfolio_stats(&rows);

        let mut warnings = report.warnings;
        for warning in table_warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }

        Ok(Dashboard {
            chart: self.chart_service.chart_points(&report.snapshots),
            table: rows.iter().map(HoldingRow::rounded).collect(),
            summary: stats.to_string(),
            stats,
            warnings,
        })
    }

    /// Dashboard from the earliest purchase date up to `today`, capped at
    /// `MAX_CHART_RANGE_DAYS`.
    pub async fn dashboard_since_inception(
        &self,
        today: NaiveDate,
    ) -> Result<Dashboard, CoreError> {
        let earliest_allowed = today
            .checked_sub_signed(chrono::Duration::days(MAX_CHART_RANGE_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let start = self
            .book
            .earliest_purchase_date()
            .unwrap_or(today)
            .clamp(earliest_allowed, today);
        self.dashboard(start, today).await
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set an API key for a provider (e.g., "alphavantage").
    /// Rebuilds the default provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.settings.api_keys.insert(provider, key);
        self.rebuild_price_service();
    }

    /// Remove an API key for a provider.
    /// Rebuilds the default provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.settings.api_keys.remove(provider).is_some();
        if removed {
            self.rebuild_price_service();
        }
        removed
    }

    /// Days fetched before a range start for forward-filling.
    pub fn set_lookback_days(&mut self, days: u32) {
        self.settings.lookback_days = days;
        self.engine = ValuationEngine::new(ValuationOptions {
            lookback_days: days,
            ..*self.engine.options()
        });
    }

    /// Which dates get a snapshot (trading days by default).
    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.engine = ValuationEngine::new(ValuationOptions {
            granularity,
            ..*self.engine.options()
        });
    }

    /// Names of the registered price providers, in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.price_service.provider_names()
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all lots as a JSON string.
    pub fn export_lots_to_json(&self) -> Result<String, CoreError> {
        self.portfolio_service.export_to_json(&self.book)
    }

    /// Import lots from a JSON string. Validates each lot.
    /// Returns the number of lots imported.
    pub fn import_lots_from_json(&mut self, json: &str) -> Result<usize, CoreError> {
        self.portfolio_service.import_from_json(&mut self.book, json)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn rebuild_price_service(&mut self) {
        let registry = PriceProviderRegistry::new_with_defaults(&self.settings);
        self.price_service = PriceService::new(registry);
    }

    fn build(settings: Settings, registry: PriceProviderRegistry) -> Self {
        let engine = ValuationEngine::new(ValuationOptions {
            lookback_days: settings.lookback_days,
            ..ValuationOptions::default()
        });

        Self {
            book: LotBook::new(),
            settings,
            price_service: PriceService::new(registry),
            portfolio_service: PortfolioService::new(),
            analytics_service: AnalyticsService::new(),
            chart_service: ChartService::new(),
            engine,
        }
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn check_chart_range(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    let range_days = (end - start).num_days();
    if range_days > MAX_CHART_RANGE_DAYS {
        return Err(CoreError::InvalidRange {
            start,
            end,
            reason: format!(
                "range of {range_days} days exceeds maximum of \
                 {MAX_CHART_RANGE_DAYS} days (10 years)"
            ),
        });
    }
    Ok(())
}
