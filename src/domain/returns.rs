//! Daily log returns derived from reference prices.
//!
//! Intraday is ln(close/open), overnight is ln(open/prev_close), full is
//! their sum. By convention intraday is undefined whenever prev_close is
//! undefined, so the first trading day contributes no return even though its
//! open and close both exist.

use crate::domain::refprice::ReferencePrice;
use chrono::{Datelike, NaiveDate, Weekday};

/// Weekday-transition class of an overnight gap, from the previous entry of
/// the trade-date sequence to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvernightKind {
    /// Mon→Tue, Tue→Wed, Wed→Thu or Thu→Fri.
    Business,
    /// Fri→Mon.
    Weekend,
    /// Any other transition (holidays, gaps, first day).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReturn {
    pub trade_date: NaiveDate,
    pub intraday: Option<f64>,
    pub overnight: Option<f64>,
    pub full: Option<f64>,
    pub overnight_kind: OvernightKind,
}

/// Classify the transition between two consecutive trading dates.
pub fn classify_overnight(prev: Option<NaiveDate>, curr: NaiveDate) -> OvernightKind {
    let Some(prev) = prev else {
        return OvernightKind::Other;
    };
    let prev_day = prev.weekday();
    let curr_day = curr.weekday();

    if prev_day == Weekday::Fri && curr_day == Weekday::Mon {
        return OvernightKind::Weekend;
    }

    let business = matches!(
        prev_day,
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu
    ) && curr_day.num_days_from_monday() == prev_day.num_days_from_monday() + 1;

    if business {
        OvernightKind::Business
    } else {
        OvernightKind::Other
    }
}

/// Compute per-day log returns from reference prices ordered by trade date.
pub fn daily_returns(prices: &[ReferencePrice]) -> Vec<DailyReturn> {
    let mut out = Vec::with_capacity(prices.len());

    for (idx, row) in prices.iter().enumerate() {
        let prev_date = if idx > 0 {
            Some(prices[idx - 1].trade_date)
        } else {
            None
        };

        let intraday = match (row.price_open, row.price_close, row.prev_close) {
            (Some(open), Some(close), Some(_)) if open != 0.0 => Some((close / open).ln()),
            _ => None,
        };

        let overnight = match (row.price_open, row.prev_close) {
            (Some(open), Some(prev)) if prev != 0.0 => Some((open / prev).ln()),
            _ => None,
        };

        let full = match (intraday, overnight) {
            (Some(i), Some(o)) => Some(i + o),
            _ => None,
        };

        out.push(DailyReturn {
            trade_date: row.trade_date,
            intraday,
            overnight,
            full,
            overnight_kind: classify_overnight(prev_date, row.trade_date),
        });
    }

    out
}

/// Cumulative value of $1 over the defined entries of a log-return series:
/// exp of the running sum, one point per day with a defined return.
pub fn cumulative_value(series: &[(NaiveDate, Option<f64>)]) -> Vec<(NaiveDate, f64)> {
    let mut sum = 0.0;
    let mut out = Vec::new();
    for &(date, ret) in series {
        if let Some(r) = ret {
            sum += r;
            out.push((date, sum.exp()));
        }
    }
    out
}
