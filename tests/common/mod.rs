#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use overnight::adapters::sqlite_store::SqliteStore;
use overnight::domain::bar::Bar;
use overnight::domain::error::OvernightError;
use overnight::domain::liquidity::{DailyVolume, LiquidDay};
use overnight::domain::refprice::ReferencePrice;
use overnight::ports::store_port::StorePort;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn hhmm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn make_bar(
    contract_id: i64,
    timestamp: &str,
    open: f64,
    close: f64,
    volume: Option<i64>,
) -> Bar {
    Bar {
        contract_id,
        timestamp: ts(timestamp),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume,
    }
}

pub fn make_ref(
    symbol: &str,
    trade_date: &str,
    price_open: Option<f64>,
    price_close: Option<f64>,
    prev_close: Option<f64>,
) -> ReferencePrice {
    ReferencePrice {
        symbol_code: symbol.to_string(),
        trade_date: date(trade_date),
        price_open,
        price_close,
        prev_close,
    }
}

/// In-memory store with the schema created and one symbol registered.
pub fn seeded_store(symbol: &str) -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store.ensure_symbol(symbol).unwrap();
    store
}

/// Store stub serving canned reference prices and a description; every other
/// operation reports an empty store.
pub struct MockStorePort {
    pub prices: Vec<ReferencePrice>,
    pub description: Option<String>,
}

impl MockStorePort {
    pub fn new() -> Self {
        Self {
            prices: Vec::new(),
            description: None,
        }
    }

    pub fn with_prices(mut self, prices: Vec<ReferencePrice>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

impl StorePort for MockStorePort {
    fn list_symbols(&self) -> Result<Vec<String>, OvernightError> {
        Ok(Vec::new())
    }

    fn liquid_symbols(&self) -> Result<Vec<String>, OvernightError> {
        Ok(Vec::new())
    }

    fn open_window_dates(
        &self,
        _symbol: &str,
        _window_start: NaiveTime,
        _window_end: NaiveTime,
    ) -> Result<Vec<NaiveDate>, OvernightError> {
        Ok(Vec::new())
    }

    fn daily_contract_volumes(&self, _symbol: &str) -> Result<Vec<DailyVolume>, OvernightError> {
        Ok(Vec::new())
    }

    fn upsert_liquid_days(
        &self,
        _symbol: &str,
        _days: &[LiquidDay],
    ) -> Result<(), OvernightError> {
        Ok(())
    }

    fn liquid_days(&self, _symbol: &str) -> Result<Vec<LiquidDay>, OvernightError> {
        Ok(Vec::new())
    }

    fn open_at(
        &self,
        _contract_id: i64,
        _date: NaiveDate,
        _time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError> {
        Ok(None)
    }

    fn close_before(
        &self,
        _contract_id: i64,
        _date: NaiveDate,
        _time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError> {
        Ok(None)
    }

    fn upsert_reference_prices(&self, rows: &[ReferencePrice]) -> Result<usize, OvernightError> {
        Ok(rows.len())
    }

    fn reference_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ReferencePrice>, OvernightError> {
        Ok(self
            .prices
            .iter()
            .filter(|p| p.symbol_code == symbol && p.trade_date >= start && p.trade_date <= end)
            .cloned()
            .collect())
    }

    fn reference_price_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OvernightError> {
        let dates: Vec<NaiveDate> = self
            .prices
            .iter()
            .filter(|p| p.symbol_code == symbol)
            .map(|p| p.trade_date)
            .collect();
        match (dates.iter().min(), dates.iter().max()) {
            (Some(&min), Some(&max)) => Ok(Some((min, max, dates.len()))),
            _ => Ok(None),
        }
    }

    fn reference_price_counts(
        &self,
        _min_rows: usize,
    ) -> Result<Vec<(String, usize)>, OvernightError> {
        Ok(Vec::new())
    }

    fn symbol_description(&self, _symbol: &str) -> Result<Option<String>, OvernightError> {
        Ok(self.description.clone())
    }
}
