//! 5-minute bar representation.
//!
//! A bar's `timestamp` is the *start* of its 5-minute interval in local
//! exchange time; the `close` field is therefore the price at
//! `timestamp + 5min`. Any "price at time T" lookup has to decide whether a
//! bar starting exactly at T is admissible (see [`crate::domain::refprice`]).

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub contract_id: i64,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Missing volume aggregates as zero, never as undefined.
    pub volume: Option<i64>,
}
