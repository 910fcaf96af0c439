//! Liquidity Selector: the most liquid contract per trading day.
//!
//! For each trade date of a symbol the selector picks the single contract
//! judged the primary trading vehicle that day, subject to three filters:
//!
//! - the date must have at least one bar (for *any* contract of the symbol)
//!   inside the required open window, otherwise the whole date is discarded
//!   (holidays and evening-only sessions drop out here);
//! - the contract must have a known last trading date with
//!   `0 <= last_trade_date - trade_date <= max_days_to_last_day`, which keeps
//!   selection near the front of the curve and drops expired contracts while
//!   still admitting a contract on its own expiry day;
//! - the contract's summed volume on the date must reach the daily minimum.
//!
//! The winner is the candidate with the highest summed volume; ties go to the
//! lowest contract id.

use crate::domain::error::OvernightError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;

/// Chosen front contract for a symbol on a trade date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidDay {
    pub trade_date: NaiveDate,
    pub contract_id: i64,
}

/// Summed daily volume for one (trade date, contract) pair, as aggregated by
/// the store (missing bar volume counted as zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyVolume {
    pub trade_date: NaiveDate,
    pub contract_id: i64,
    pub volume: i64,
    pub last_trade_date: Option<NaiveDate>,
}

/// Filter thresholds for liquid-contract selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityFilters {
    /// Calendar days between trade date and the contract's last trading date.
    pub max_days_to_last_day: i64,
    pub min_daily_volume: i64,
    pub required_open_start: NaiveTime,
    pub required_open_end: NaiveTime,
}

impl Default for LiquidityFilters {
    fn default() -> Self {
        Self {
            max_days_to_last_day: 100,
            min_daily_volume: 1500,
            required_open_start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            required_open_end: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        }
    }
}

impl LiquidityFilters {
    /// Read thresholds from the `[filters]` config section, falling back to
    /// the defaults for any missing key.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, OvernightError> {
        let defaults = Self::default();
        Ok(Self {
            max_days_to_last_day: config.get_int(
                "filters",
                "max_days_to_last_day",
                defaults.max_days_to_last_day,
            ),
            min_daily_volume: config.get_int(
                "filters",
                "min_daily_volume",
                defaults.min_daily_volume,
            ),
            required_open_start: parse_time_key(
                config,
                "required_open_start",
                defaults.required_open_start,
            )?,
            required_open_end: parse_time_key(
                config,
                "required_open_end",
                defaults.required_open_end,
            )?,
        })
    }
}

fn parse_time_key(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, OvernightError> {
    match config.get_string("filters", key) {
        Some(value) => {
            NaiveTime::parse_from_str(&value, "%H:%M").map_err(|_| OvernightError::ConfigInvalid {
                section: "filters".into(),
                key: key.into(),
                reason: "invalid time format (expected HH:MM)".into(),
            })
        }
        None => Ok(default),
    }
}

/// Pick the winning contract per trade date from pre-aggregated daily volumes.
///
/// `open_window_dates` is the set of dates that passed the open-window filter;
/// it is evaluated per date across all contracts of the symbol, so a date
/// missing from it is excluded even when some contract had qualifying volume.
/// Output is ordered by trade date.
pub fn select_winners(
    volumes: &[DailyVolume],
    open_window_dates: &[NaiveDate],
    filters: &LiquidityFilters,
) -> Vec<LiquidDay> {
    let allowed: HashSet<NaiveDate> = open_window_dates.iter().copied().collect();

    let mut winners: Vec<(NaiveDate, i64, i64)> = Vec::new(); // (date, volume, contract_id)

    for dv in volumes {
        if !allowed.contains(&dv.trade_date) {
            continue;
        }
        let Some(last_trade_date) = dv.last_trade_date else {
            continue;
        };
        let days_left = (last_trade_date - dv.trade_date).num_days();
        if days_left < 0 || days_left > filters.max_days_to_last_day {
            continue;
        }
        if dv.volume < filters.min_daily_volume {
            continue;
        }

        match winners.iter_mut().find(|(d, _, _)| *d == dv.trade_date) {
            Some(entry) => {
                let (_, best_vol, best_id) = *entry;
                if dv.volume > best_vol || (dv.volume == best_vol && dv.contract_id < best_id) {
                    entry.1 = dv.volume;
                    entry.2 = dv.contract_id;
                }
            }
            None => winners.push((dv.trade_date, dv.volume, dv.contract_id)),
        }
    }

    winners.sort_by_key(|(d, _, _)| *d);
    winners
        .into_iter()
        .map(|(trade_date, _, contract_id)| LiquidDay {
            trade_date,
            contract_id,
        })
        .collect()
}

/// Compute and persist the liquid-contract-per-day series for one symbol.
///
/// Returns the number of rows written (or that would be written under
/// `dry_run`). An empty candidate set is a benign no-op.
pub fn compute_liquid_contracts(
    store: &dyn StorePort,
    symbol: &str,
    filters: &LiquidityFilters,
    dry_run: bool,
) -> Result<usize, OvernightError> {
    let open_dates =
        store.open_window_dates(symbol, filters.required_open_start, filters.required_open_end)?;
    let volumes = store.daily_contract_volumes(symbol)?;

    let winners = select_winners(&volumes, &open_dates, filters);

    if winners.is_empty() {
        eprintln!(
            "No winners for {} after applying filters (min_daily_volume={}, max_days_to_last_day={}, required open {}-{})",
            symbol,
            filters.min_daily_volume,
            filters.max_days_to_last_day,
            filters.required_open_start.format("%H:%M"),
            filters.required_open_end.format("%H:%M"),
        );
        return Ok(0);
    }

    if dry_run {
        eprintln!(
            "Dry run: would upsert {} rows into liquid_contract_daily for {}",
            winners.len(),
            symbol
        );
        return Ok(winners.len());
    }

    store.upsert_liquid_days(symbol, &winners)?;
    eprintln!(
        "Inserted/updated {} rows into liquid_contract_daily for {}",
        winners.len(),
        symbol
    );
    Ok(winners.len())
}
