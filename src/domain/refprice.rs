//! Reference Price Builder: daily open/close/prev-close per symbol.
//!
//! Bar timestamps mark interval *starts*, so the price at a nominal time T is
//! the `close` of the last bar strictly before T; a bar starting exactly at T
//! closes five minutes later and must be excluded. The nominal open is the
//! exception: a bar starting exactly at the open carries the correct price in
//! its `open` field, so that bar is preferred and the strictly-before close
//! is only a fallback.
//!
//! `prev_close` is looked up on the positionally previous entry of the
//! symbol's liquid-day sequence (not the calendar-previous date) using the
//! *current* day's contract. At rollover boundaries that can compare prices
//! across contracts; that is deliberate source behavior, kept pending product
//! review rather than corrected here.

use crate::domain::error::OvernightError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveTime};

/// Canonical open/close/prev-close triple for one symbol and trade date.
/// Any price may be undefined when no qualifying bar exists; absence
/// propagates as `None`, never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePrice {
    pub symbol_code: String,
    pub trade_date: NaiveDate,
    pub price_open: Option<f64>,
    pub price_close: Option<f64>,
    pub prev_close: Option<f64>,
}

/// Nominal session times used for price extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionTimes {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for SessionTimes {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }
}

impl SessionTimes {
    /// Read session times from the `[session]` config section, falling back
    /// to the 09:30/16:00 defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, OvernightError> {
        let defaults = Self::default();
        Ok(Self {
            open: parse_time_key(config, "open_time", defaults.open)?,
            close: parse_time_key(config, "close_time", defaults.close)?,
        })
    }
}

fn parse_time_key(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, OvernightError> {
    match config.get_string("session", key) {
        Some(value) => {
            NaiveTime::parse_from_str(&value, "%H:%M").map_err(|_| OvernightError::ConfigInvalid {
                section: "session".into(),
                key: key.into(),
                reason: "invalid time format (expected HH:MM)".into(),
            })
        }
        None => Ok(default),
    }
}

/// Derive reference prices for each liquid day of `symbol` and upsert them.
///
/// Returns the number of rows written (or that would be written under
/// `dry_run`). A symbol without liquid days is a benign no-op.
pub fn process_symbol(
    store: &dyn StorePort,
    symbol: &str,
    times: &SessionTimes,
    dry_run: bool,
    verbose: bool,
) -> Result<usize, OvernightError> {
    let days = store.liquid_days(symbol)?;
    if days.is_empty() {
        eprintln!("No trade days found for symbol {}", symbol);
        return Ok(0);
    }

    let mut rows: Vec<ReferencePrice> = Vec::with_capacity(days.len());

    for (idx, day) in days.iter().enumerate() {
        let cid = day.contract_id;

        // Prefer the open of the bar starting exactly at the nominal open;
        // fall back to the close of the last bar strictly before it.
        let price_open = match store.open_at(cid, day.trade_date, times.open)? {
            Some(open) => Some(open),
            None => store.close_before(cid, day.trade_date, times.open)?,
        };

        let price_close = store.close_before(cid, day.trade_date, times.close)?;

        // Same contract as today, evaluated on the previous entry of the
        // liquid-day sequence. The first entry has no predecessor.
        let prev_close = if idx > 0 {
            store.close_before(cid, days[idx - 1].trade_date, times.close)?
        } else {
            None
        };

        if verbose {
            eprintln!(
                "  {} {} contract={} open={:?} close={:?} prev_close={:?}",
                symbol, day.trade_date, cid, price_open, price_close, prev_close
            );
        }

        rows.push(ReferencePrice {
            symbol_code: symbol.to_string(),
            trade_date: day.trade_date,
            price_open,
            price_close,
            prev_close,
        });
    }

    if dry_run {
        eprintln!("Dry run: would insert {} rows for {}", rows.len(), symbol);
        return Ok(rows.len());
    }

    let written = store.upsert_reference_prices(&rows)?;
    eprintln!(
        "Inserted/updated {} rows into daily_reference_prices for {}",
        written, symbol
    );
    Ok(written)
}
