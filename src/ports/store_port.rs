//! Relational store access port trait.
//!
//! All reads are side-effect free; every write is an upsert on the row's
//! natural key, so re-running a stage is idempotent.

use crate::domain::error::OvernightError;
use crate::domain::liquidity::{DailyVolume, LiquidDay};
use crate::domain::refprice::ReferencePrice;
use chrono::{NaiveDate, NaiveTime};

pub trait StorePort {
    /// All symbols from the symbols table, ordered.
    fn list_symbols(&self) -> Result<Vec<String>, OvernightError>;

    /// Distinct symbols present in the liquid-contract-per-day table, ordered.
    fn liquid_symbols(&self) -> Result<Vec<String>, OvernightError>;

    /// Dates on which the symbol has at least one bar (any contract) with a
    /// start time inside the half-open `[window_start, window_end)`, compared
    /// on HH:MM.
    fn open_window_dates(
        &self,
        symbol: &str,
        window_start: NaiveTime,
        window_end: NaiveTime,
    ) -> Result<Vec<NaiveDate>, OvernightError>;

    /// Summed volume per (trade date, contract) for the symbol, with the
    /// contract's last trading date attached. Missing bar volume counts as
    /// zero.
    fn daily_contract_volumes(&self, symbol: &str) -> Result<Vec<DailyVolume>, OvernightError>;

    fn upsert_liquid_days(&self, symbol: &str, days: &[LiquidDay]) -> Result<(), OvernightError>;

    /// Liquid-day sequence for the symbol, ordered by trade date.
    fn liquid_days(&self, symbol: &str) -> Result<Vec<LiquidDay>, OvernightError>;

    /// `open` of the bar starting exactly at `time` (HH:MM match) on `date`.
    fn open_at(
        &self,
        contract_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError>;

    /// `close` of the last bar strictly before `time` (HH:MM match) on `date`.
    fn close_before(
        &self,
        contract_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError>;

    fn upsert_reference_prices(&self, rows: &[ReferencePrice]) -> Result<usize, OvernightError>;

    /// Reference prices for the symbol within `[start, end]`, ordered by
    /// trade date.
    fn reference_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ReferencePrice>, OvernightError>;

    /// (min, max, count) of reference-price trade dates for the symbol.
    fn reference_price_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OvernightError>;

    /// Symbols with at least `min_rows` reference-price rows, with counts,
    /// ordered by symbol.
    fn reference_price_counts(
        &self,
        min_rows: usize,
    ) -> Result<Vec<(String, usize)>, OvernightError>;

    /// Human description for a symbol from the rollover rules, if any.
    fn symbol_description(&self, symbol: &str) -> Result<Option<String>, OvernightError>;
}
