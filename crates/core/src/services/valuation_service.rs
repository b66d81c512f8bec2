use chrono::{Datelike, Duration, NaiveDate, Weekday};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::chart::{ValuationReport, ValuationWarning};
use crate::models::lot::Lot;
use crate::models::price::{PriceBook, PriceSeries};
use crate::models::settings::DEFAULT_LOOKBACK_DAYS;
use crate::models::snapshot::{PortfolioSnapshot, Position};
use crate::providers::traits::PriceSource;

/// Which dates get a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Dates the price source has quotes for. Falls back to Monday–Friday
    /// when the fetched series have no date inside the range.
    #[default]
    TradingDays,
    /// Every calendar day in the range.
    CalendarDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationOptions {
    pub granularity: Granularity,

    /// Days fetched before the range start so early dates can forward-fill.
    pub lookback_days: u32,
}

impl Default for ValuationOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Dates bounding one ticker's price fetch.
#[derive(Debug, Clone, Copy)]
struct FetchWindow {
    first_needed: NaiveDate,
    from: NaiveDate,
    history_from: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapPolicy {
    Fail,
    Warn,
}

/// Values a set of lots over a date range.
///
/// For every date on the grid, each lot with `purchase_date <= date`
/// contributes `shares × price(ticker, date)`. A missing price is
/// forward-filled from the most recent prior quote; with no prior quote the
/// date is a data gap. Gain/loss is the total value minus the cost basis of
/// the same lots.
///
/// The arithmetic (`value_series`) is synchronous and pure over a
/// [`PriceBook`]; `compute_timeseries` only adds one fetch per ticker.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    options: ValuationOptions,
}

impl ValuationEngine {
    pub fn new(options: ValuationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValuationOptions {
        &self.options
    }

    /// Fetch prices for every held ticker and value the lots on each date.
    ///
    /// Fails with `InvalidRange` when `end < start`, `UnknownTicker` when the
    /// source cannot resolve a ticker, and `DataGap` when a held ticker has
    /// no price on or before some date.
    pub async fn compute_timeseries(
        &self,
        lots: &[Lot],
        source: &dyn PriceSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioSnapshot>, CoreError> {
        check_range(start, end)?;
        let mut book = PriceBook::new();
        for (_, result) in self.fetch(lots, source, start, end).await? {
            book.insert(result?);
        }
        self.value_series(lots, &book, start, end)
    }

    /// Like `compute_timeseries`, but unresolvable tickers and data gaps
    /// become warnings and the rest of the portfolio is still valued.
    ///
    /// Only `InvalidRange` fails.
    pub async fn compute_report(
        &self,
        lots: &[Lot],
        source: &dyn PriceSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ValuationReport, CoreError> {
        check_range(start, end)?;
        let mut book = PriceBook::new();
        let mut warnings = Vec::new();
        for (ticker, result) in self.fetch(lots, source, start, end).await? {
            match result {
                Ok(series) => book.insert(series),
                Err(CoreError::UnknownTicker(_)) => {
                    warn!(ticker = %ticker, "Skipping lots of unknown ticker");
                    warnings.push(ValuationWarning::UnknownTicker { ticker });
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Skipping lots without prices");
                    warnings.push(ValuationWarning::PriceUnavailable {
                        ticker,
                        message: e.to_string(),
                    });
                }
            }
        }

        let priced: Vec<Lot> = lots
            .iter()
            .filter(|lot| book.contains(lot.ticker()))
            .cloned()
            .collect();
        let (snapshots, gaps) = self.compute(&priced, &book, start, end, GapPolicy::Warn)?;
        warnings.extend(gaps);
        Ok(ValuationReport {
            snapshots,
            warnings,
        })
    }

    /// Value lots against already-fetched prices. Pure.
    ///
    /// A held ticker missing from `book` is reported as `UnknownTicker`.
    pub fn value_series(
        &self,
        lots: &[Lot],
        book: &PriceBook,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioSnapshot>, CoreError> {
        self.compute(lots, book, start, end, GapPolicy::Fail)
            .map(|(snapshots, _)| snapshots)
    }

    /// Issue one fetch per distinct held ticker, concurrently.
    ///
    /// A ticker whose window holds no price on or before its first needed
    /// date (a halted stock, say) is fetched once more from its earliest
    /// purchase, so forward-fill can reach back to the last real close.
    /// Results come back sorted by ticker so error reporting is deterministic.
    async fn fetch(
        &self,
        lots: &[Lot],
        source: &dyn PriceSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(String, Result<PriceSeries, CoreError>)>, CoreError> {
        let windows = self.fetch_windows(lots, start, end)?;
        let fetches = windows.into_iter().map(|(ticker, window)| async move {
            debug!(ticker = %ticker, from = %window.from, %end, "Fetching price series");
            let mut result = source.price_series(&ticker, window.from, end).await;
            let no_prior = matches!(
                &result,
                Ok(series) if series.price_on_or_before(window.first_needed).is_none()
            );
            if no_prior && window.history_from < window.from {
                debug!(
                    ticker = %ticker,
                    from = %window.history_from,
                    "No price before range start, fetching from earliest purchase"
                );
                result = source.price_series(&ticker, window.history_from, end).await;
            }
            (ticker, result)
        });
        Ok(join_all(fetches).await)
    }

    fn fetch_windows(
        &self,
        lots: &[Lot],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, FetchWindow>, CoreError> {
        let mut earliest: BTreeMap<String, NaiveDate> = BTreeMap::new();
        for lot in lots.iter().filter(|lot| lot.purchase_date() <= end) {
            earliest
                .entry(lot.ticker().to_string())
                .and_modify(|d| *d = (*d).min(lot.purchase_date()))
                .or_insert(lot.purchase_date());
        }

        let lookback = Duration::days(i64::from(self.options.lookback_days));
        let before = |date: NaiveDate| {
            date.checked_sub_signed(lookback)
                .ok_or_else(|| CoreError::InvalidRange {
                    start,
                    end,
                    reason: format!("lookback from {date} is out of the supported date range"),
                })
        };

        earliest
            .into_iter()
            .map(|(ticker, purchased)| {
                let first_needed = purchased.max(start);
                let window = FetchWindow {
                    first_needed,
                    from: before(first_needed)?,
                    history_from: before(purchased)?,
                };
                Ok((ticker, window))
            })
            .collect()
    }

    fn compute(
        &self,
        lots: &[Lot],
        book: &PriceBook,
        start: NaiveDate,
        end: NaiveDate,
        policy: GapPolicy,
    ) -> Result<(Vec<PortfolioSnapshot>, Vec<ValuationWarning>), CoreError> {
        check_range(start, end)?;

        let mut by_ticker: BTreeMap<&str, Vec<&Lot>> = BTreeMap::new();
        for lot in lots.iter().filter(|lot| lot.purchase_date() <= end) {
            by_ticker.entry(lot.ticker()).or_default().push(lot);
        }

        let mut priced: Vec<(&str, &PriceSeries, Vec<&Lot>)> = Vec::with_capacity(by_ticker.len());
        for (ticker, mut ticker_lots) in by_ticker {
            let series = book
                .get(ticker)
                .ok_or_else(|| CoreError::UnknownTicker(ticker.to_string()))?;
            ticker_lots.sort_by_key(|lot| lot.purchase_date());
            priced.push((ticker, series, ticker_lots));
        }

        let grid = self.date_grid(priced.iter().map(|(_, series, _)| *series), start, end);
        let mut snapshots = Vec::with_capacity(grid.len());
        let mut warnings = Vec::new();
        let mut gapped: BTreeSet<&str> = BTreeSet::new();

        for date in grid {
            let mut positions = BTreeMap::new();
            for (ticker, series, ticker_lots) in &priced {
                // Lots are sorted by purchase date, so the held ones are a prefix.
                let held = ticker_lots.partition_point(|lot| lot.is_held_on(date));
                if held == 0 {
                    continue;
                }
                let Some(point) = series.price_on_or_before(date) else {
                    match policy {
                        GapPolicy::Fail => {
                            return Err(CoreError::DataGap {
                                ticker: ticker.to_string(),
                                date,
                            })
                        }
                        GapPolicy::Warn => {
                            if gapped.insert(*ticker) {
                                warn!(ticker, %date, "No prior price, lots excluded");
                                warnings.push(ValuationWarning::DataGap {
                                    ticker: ticker.to_string(),
                                    date,
                                });
                            }
                            continue;
                        }
                    }
                };
                let shares: f64 = ticker_lots[..held].iter().map(|lot| lot.shares()).sum();
                let cost_basis: f64 = ticker_lots[..held].iter().map(|lot| lot.cost_basis()).sum();
                positions.insert(
                    ticker.to_string(),
                    Position {
                        shares,
                        price: point.price,
                        market_value: shares * point.price,
                        cost_basis,
                    },
                );
            }
            snapshots.push(PortfolioSnapshot::from_positions(date, positions));
        }

        Ok((snapshots, warnings))
    }

    fn date_grid<'a>(
        &self,
        series: impl Iterator<Item = &'a PriceSeries>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<NaiveDate> {
        match self.options.granularity {
            Granularity::CalendarDays => days(start, end).collect(),
            Granularity::TradingDays => {
                let trading: BTreeSet<NaiveDate> =
                    series.flat_map(|s| s.dates_in(start, end)).collect();
                if trading.is_empty() {
                    days(start, end).filter(|d| is_weekday(*d)).collect()
                } else {
                    trading.into_iter().collect()
                }
            }
        }
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::InvalidRange {
            start,
            end,
            reason: "end date is before start date".into(),
        });
    }
    Ok(())
}

fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
