use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single price data point (date → closing price).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Daily closing prices for one ticker.
///
/// Invariant: points are ascending by date with no duplicate dates, and every
/// price is finite and non-negative. All lookups rely on this for binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points in any order.
    ///
    /// Points are sorted by date; when a date appears more than once the last
    /// occurrence wins. Non-finite and negative prices are dropped.
    pub fn new(ticker: impl Into<String>, points: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut points: Vec<PricePoint> = points
            .into_iter()
            .filter(|p| p.price.is_finite() && p.price >= 0.0)
            .collect();
        // Stable sort keeps input order within a date, so "last wins" below is well defined.
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self {
            ticker: ticker.into().to_uppercase(),
            points: deduped,
        }
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self::new(ticker, Vec::new())
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// The most recent point in the series.
    pub fn latest(&self) -> Option<PricePoint> {
        self.points.last().copied()
    }

    /// Exact-date price.
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].price)
    }

    /// Forward-filled price: the exact-date price, or the most recent prior one.
    pub fn price_on_or_before(&self, date: NaiveDate) -> Option<PricePoint> {
        let end = match self.points.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        end.checked_sub(1).map(|idx| self.points[idx])
    }

    /// First price on or after `date` (e.g. the fill for a weekend purchase).
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<PricePoint> {
        let start = self
            .points
            .binary_search_by_key(&date, |p| p.date)
            .unwrap_or_else(|pos| pos);
        self.points.get(start).copied()
    }

    /// Dates with a price inside `[from, to]`.
    pub fn dates_in(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        let start = self
            .points
            .binary_search_by_key(&from, |p| p.date)
            .unwrap_or_else(|pos| pos);
        self.points[start..]
            .iter()
            .take_while(move |p| p.date <= to)
            .map(|p| p.date)
    }
}

/// Price series fetched for one valuation, keyed by uppercased ticker.
///
/// Lives only for the duration of one render cycle; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    series: HashMap<String, PriceSeries>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series, replacing any previous one for the same ticker.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceSeries> {
        self.series.get(&ticker.to_uppercase())
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.series.contains_key(&ticker.to_uppercase())
    }

    /// Number of tickers held.
    pub fn ticker_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of price points across all tickers.
    pub fn total_points(&self) -> usize {
        self.series.values().map(PriceSeries::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }
}

impl FromIterator<PriceSeries> for PriceBook {
    fn from_iter<I: IntoIterator<Item = PriceSeries>>(iter: I) -> Self {
        let mut book = Self::new();
        for series in iter {
            book.insert(series);
        }
        book
    }
}
