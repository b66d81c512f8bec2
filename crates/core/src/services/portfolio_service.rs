use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::lot::{Lot, NewLot};
use crate::models::price::PricePoint;
use crate::providers::traits::PriceSource;

/// Days fetched after a purchase date when deriving its cost basis,
/// long enough to reach the next trading day over a holiday weekend.
const PURCHASE_FILL_WINDOW_DAYS: i64 = 7;

/// The session's list of held lots, in insertion order.
///
/// Nothing here is persisted; it lives exactly as long as the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotBook {
    lots: Vec<Lot>,
}

impl LotBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn get(&self, id: Uuid) -> Option<&Lot> {
        self.lots.iter().find(|lot| lot.id() == id)
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Distinct tickers, sorted.
    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.lots.iter().map(Lot::ticker).collect();
        tickers.sort_unstable();
        tickers.dedup();
        tickers
    }

    pub fn earliest_purchase_date(&self) -> Option<NaiveDate> {
        self.lots.iter().map(Lot::purchase_date).min()
    }

    fn push(&mut self, lot: Lot) {
        self.lots.push(lot);
    }

    fn remove(&mut self, id: Uuid) -> Result<Lot, CoreError> {
        let idx = self
            .lots
            .iter()
            .position(|lot| lot.id() == id)
            .ok_or_else(|| CoreError::LotNotFound(id.to_string()))?;
        Ok(self.lots.remove(idx))
    }

    fn clear(&mut self) {
        self.lots.clear();
    }
}

/// Manages the session lot list: validation at the input boundary,
/// cost-basis resolution, add/remove and JSON export/import.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Validate form input and turn it into a lot.
    ///
    /// Without an explicit cost basis, it is derived as
    /// `shares × purchase-day price`, where the purchase-day price is the first
    /// close on or after the purchase date (falling back to the latest close before it).
    pub async fn resolve_lot(
        &self,
        input: &NewLot,
        source: &dyn PriceSource,
        today: NaiveDate,
    ) -> Result<Lot, CoreError> {
        let ticker = input.validate(today)?;
        let cost_basis = match input.cost_basis {
            Some(cost_basis) => cost_basis,
            None => {
                let fill = self
                    .purchase_price(source, &ticker, input.purchase_date, today)
                    .await?;
                input.shares * fill.price
            }
        };
        Lot::new(ticker, input.shares, input.purchase_date, cost_basis)
    }

    /// Price a purchase would have filled at.
    pub async fn purchase_price(
        &self,
        source: &dyn PriceSource,
        ticker: &str,
        purchase_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<PricePoint, CoreError> {
        let window = chrono::Duration::days(PURCHASE_FILL_WINDOW_DAYS);
        let out_of_range = || {
            CoreError::Validation(format!(
                "Purchase date {purchase_date} is out of the supported date range"
            ))
        };
        let from = purchase_date
            .checked_sub_signed(window)
            .ok_or_else(out_of_range)?;
        let to = purchase_date
            .checked_add_signed(window)
            .ok_or_else(out_of_range)?
            .min(today);
        let series = source.price_series(ticker, from, to).await?;
        series
            .first_on_or_after(purchase_date)
            .or_else(|| series.price_on_or_before(purchase_date))
            .ok_or_else(|| CoreError::DataGap {
                ticker: ticker.to_string(),
                date: purchase_date,
            })
    }

    /// Validate, resolve and append one lot. Returns the new lot.
    pub async fn add_lot(
        &self,
        book: &mut LotBook,
        input: &NewLot,
        source: &dyn PriceSource,
        today: NaiveDate,
    ) -> Result<Lot, CoreError> {
        let lot = self.resolve_lot(input, source, today).await?;
        self.insert_lot(book, lot.clone());
        Ok(lot)
    }

    /// Append an already-resolved lot.
    pub fn insert_lot(&self, book: &mut LotBook, lot: Lot) {
        info!(
            lot_id = %lot.id(),
            ticker = lot.ticker(),
            shares = lot.shares(),
            purchase_date = %lot.purchase_date(),
            cost_basis = lot.cost_basis(),
            "Lot added"
        );
        book.push(lot);
    }

    /// Add several lots. If any input fails, none are added (all-or-nothing).
    pub async fn add_lots(
        &self,
        book: &mut LotBook,
        inputs: &[NewLot],
        source: &dyn PriceSource,
        today: NaiveDate,
    ) -> Result<Vec<Lot>, CoreError> {
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            resolved.push(self.resolve_lot(input, source, today).await?);
        }
        for lot in &resolved {
            book.push(lot.clone());
        }
        info!(count = resolved.len(), "Lots added");
        Ok(resolved)
    }

    /// Remove a lot by its id. Returns the removed lot.
    pub fn remove_lot(&self, book: &mut LotBook, id: Uuid) -> Result<Lot, CoreError> {
        let lot = book.remove(id)?;
        info!(lot_id = %id, ticker = lot.ticker(), "Lot removed");
        Ok(lot)
    }

    pub fn clear(&self, book: &mut LotBook) {
        book.clear();
    }

    /// Export all lots as a JSON array.
    pub fn export_to_json(&self, book: &LotBook) -> Result<String, CoreError> {
        serde_json::to_string_pretty(book.lots())
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize lots to JSON: {e}")))
    }

    /// Import lots from a JSON array. Every lot is re-validated on parse and ids
    /// must not collide with lots already in the book. All-or-nothing.
    /// Returns the number of lots imported.
    pub fn import_from_json(&self, book: &mut LotBook, json: &str) -> Result<usize, CoreError> {
        let lots: Vec<Lot> = serde_json::from_str(json)?;
        for (i, lot) in lots.iter().enumerate() {
            let duplicate = book.get(lot.id()).is_some()
                || lots[..i].iter().any(|other| other.id() == lot.id());
            if duplicate {
                return Err(CoreError::Validation(format!("Duplicate lot id {}", lot.id())));
            }
        }
        let count = lots.len();
        for lot in lots {
            book.push(lot);
        }
        info!(count, "Lots imported");
        Ok(count)
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
