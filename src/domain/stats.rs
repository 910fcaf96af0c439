//! Annualized return statistics from log-return series.

use crate::domain::error::OvernightError;
use crate::domain::returns::{self, DailyReturn, OvernightKind};
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics for one log-return series. `None` means undefined
/// (rendered as `nan`), never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    /// Compounded final value of $1.
    pub final_value: Option<f64>,
    /// Mean daily simple return, percent.
    pub daily_mean_pct: Option<f64>,
    /// Geometric annualized mean return, percent (252-day convention).
    pub annual_mean_pct: Option<f64>,
    /// Annualized sample standard deviation, percent.
    pub annual_std_pct: Option<f64>,
    /// Annualized Sharpe at zero risk-free rate, decimal.
    pub ann_sharpe: Option<f64>,
}

impl SeriesStats {
    /// Compute stats over the defined entries of a log-return series.
    pub fn from_log_returns(series: impl Iterator<Item = Option<f64>>) -> Self {
        let simple: Vec<f64> = series.flatten().map(|r| r.exp() - 1.0).collect();
        let n = simple.len();
        if n == 0 {
            return Self {
                final_value: None,
                daily_mean_pct: None,
                annual_mean_pct: None,
                annual_std_pct: None,
                ann_sharpe: None,
            };
        }

        let final_value: f64 = simple.iter().map(|s| 1.0 + s).product();
        let daily_mean_pct = simple.iter().sum::<f64>() / n as f64 * 100.0;

        // Geometric annualization is undefined when the series loses
        // everything (final value <= 0).
        let annual_mean = if final_value > 0.0 {
            Some(final_value.powf(TRADING_DAYS_PER_YEAR / n as f64) - 1.0)
        } else {
            None
        };

        let mean = simple.iter().sum::<f64>() / n as f64;
        // Bessel's correction when n > 1.
        let ddof = if n > 1 { n - 1 } else { n };
        let variance = simple.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / ddof as f64;
        let annual_std = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();

        let ann_sharpe = match annual_mean {
            Some(m) if annual_std != 0.0 => Some(m / annual_std),
            _ => None,
        };

        Self {
            final_value: Some(final_value),
            daily_mean_pct: Some(daily_mean_pct),
            annual_mean_pct: annual_mean.map(|m| m * 100.0),
            annual_std_pct: Some(annual_std * 100.0),
            ann_sharpe,
        }
    }
}

/// Row labels of the stats table, in display order.
pub const STAT_ROWS: [&str; 5] = [
    "Final value of $1",
    "Daily Mean Ret (%)",
    "Annual Mean Ret (%)",
    "Annual StdDev(%)",
    "Ann Sharpe Ratio",
];

impl SeriesStats {
    /// Values in [`STAT_ROWS`] order.
    pub fn values(&self) -> [Option<f64>; 5] {
        [
            self.final_value,
            self.daily_mean_pct,
            self.annual_mean_pct,
            self.annual_std_pct,
            self.ann_sharpe,
        ]
    }
}

/// Stats table for a symbol: one [`SeriesStats`] column per return series.
#[derive(Debug, Clone)]
pub struct StatsReport {
    /// Header label, `<description> (<symbol>) stats`.
    pub title: String,
    pub columns: Vec<(String, SeriesStats)>,
    pub returns: Vec<DailyReturn>,
}

/// Build the stats columns for a symbol's daily returns.
///
/// Always includes Full, Intraday and Overnight; `weekend_split` adds the
/// business-day-only and weekend-spanning-only overnight subsets.
pub fn build_columns(returns: &[DailyReturn], weekend_split: bool) -> Vec<(String, SeriesStats)> {
    let mut columns = vec![
        (
            "Full".to_string(),
            SeriesStats::from_log_returns(returns.iter().map(|r| r.full)),
        ),
        (
            "Intraday".to_string(),
            SeriesStats::from_log_returns(returns.iter().map(|r| r.intraday)),
        ),
        (
            if weekend_split {
                "Overnight (all)".to_string()
            } else {
                "Overnight".to_string()
            },
            SeriesStats::from_log_returns(returns.iter().map(|r| r.overnight)),
        ),
    ];

    if weekend_split {
        columns.push((
            "Overnight (business)".to_string(),
            SeriesStats::from_log_returns(returns.iter().map(|r| {
                r.overnight
                    .filter(|_| r.overnight_kind == OvernightKind::Business)
            })),
        ));
        columns.push((
            "Overnight (weekend)".to_string(),
            SeriesStats::from_log_returns(returns.iter().map(|r| {
                r.overnight
                    .filter(|_| r.overnight_kind == OvernightKind::Weekend)
            })),
        ));
    }

    columns
}

/// Compute the full stats report for a symbol over `[start, end]`.
///
/// The title uses the rollover-rules description when present, the symbol
/// code otherwise. A range matching no rows yields a report whose statistics
/// are all undefined; callers that need "symbol has no data at all" to fail
/// check the symbol's full range before narrowing it.
pub fn compute_reference_stats(
    store: &dyn StorePort,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    weekend_split: bool,
) -> Result<StatsReport, OvernightError> {
    let prices = store.reference_prices(symbol, start, end)?;

    let description = store
        .symbol_description(symbol)?
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| symbol.to_string());

    let daily = returns::daily_returns(&prices);
    let columns = build_columns(&daily, weekend_split);

    Ok(StatsReport {
        title: format!("{description} ({symbol}) stats"),
        columns,
        returns: daily,
    })
}

/// Cumulative $1 series per return type, for charting.
pub fn cumulative_series(
    daily: &[DailyReturn],
    weekend_split: bool,
) -> Vec<(String, Vec<(NaiveDate, f64)>)> {
    let full: Vec<_> = daily.iter().map(|r| (r.trade_date, r.full)).collect();
    let intraday: Vec<_> = daily.iter().map(|r| (r.trade_date, r.intraday)).collect();
    let overnight: Vec<_> = daily.iter().map(|r| (r.trade_date, r.overnight)).collect();

    let mut series = vec![
        ("Full".to_string(), returns::cumulative_value(&full)),
        ("Intraday".to_string(), returns::cumulative_value(&intraday)),
        (
            if weekend_split {
                "Overnight (all)".to_string()
            } else {
                "Overnight".to_string()
            },
            returns::cumulative_value(&overnight),
        ),
    ];

    if weekend_split {
        let business: Vec<_> = daily
            .iter()
            .map(|r| {
                (
                    r.trade_date,
                    r.overnight
                        .filter(|_| r.overnight_kind == OvernightKind::Business),
                )
            })
            .collect();
        let weekend: Vec<_> = daily
            .iter()
            .map(|r| {
                (
                    r.trade_date,
                    r.overnight
                        .filter(|_| r.overnight_kind == OvernightKind::Weekend),
                )
            })
            .collect();
        series.push((
            "Overnight (business)".to_string(),
            returns::cumulative_value(&business),
        ));
        series.push((
            "Overnight (weekend)".to_string(),
            returns::cumulative_value(&weekend),
        ));
    }

    series
}

/// Format one stat value the way the report prints it.
pub fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.3}", v),
        _ => "nan".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_series_is_all_undefined() {
        let stats = SeriesStats::from_log_returns(std::iter::empty());
        assert_eq!(stats.final_value, None);
        assert_eq!(stats.daily_mean_pct, None);
        assert_eq!(stats.annual_mean_pct, None);
        assert_eq!(stats.annual_std_pct, None);
        assert_eq!(stats.ann_sharpe, None);
    }

    #[test]
    fn undefined_days_are_dropped() {
        let a = SeriesStats::from_log_returns(vec![Some(0.01), None, Some(-0.02)].into_iter());
        let b = SeriesStats::from_log_returns(vec![Some(0.01), Some(-0.02)].into_iter());
        assert_eq!(a, b);
    }

    #[test]
    fn final_value_compounds_simple_returns() {
        let r1 = 0.01f64;
        let r2 = -0.005f64;
        let stats = SeriesStats::from_log_returns(vec![Some(r1), Some(r2)].into_iter());
        let expected = (1.0 + (r1.exp() - 1.0)) * (1.0 + (r2.exp() - 1.0));
        assert_relative_eq!(stats.final_value.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn constant_series_has_zero_std_and_no_sharpe() {
        let stats =
            SeriesStats::from_log_returns(vec![Some(0.01), Some(0.01), Some(0.01)].into_iter());
        assert_relative_eq!(stats.annual_std_pct.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(stats.ann_sharpe, None);
    }

    #[test]
    fn single_observation_uses_population_std() {
        // n == 1: no Bessel correction, stdev is zero.
        let stats = SeriesStats::from_log_returns(vec![Some(0.02)].into_iter());
        assert_relative_eq!(stats.annual_std_pct.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn annualized_mean_uses_252_day_convention() {
        // One year of a constant 0.1% log return.
        let series = vec![Some(0.001); 252];
        let n = series.len() as f64;
        let stats = SeriesStats::from_log_returns(series.into_iter());
        let final_value = stats.final_value.unwrap();
        let expected = final_value.powf(252.0 / n) - 1.0;
        assert_relative_eq!(
            stats.annual_mean_pct.unwrap(),
            expected * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn sharpe_is_mean_over_std() {
        let stats =
            SeriesStats::from_log_returns(vec![Some(0.01), Some(0.02), Some(-0.01)].into_iter());
        let mean = stats.annual_mean_pct.unwrap() / 100.0;
        let std = stats.annual_std_pct.unwrap() / 100.0;
        assert_relative_eq!(stats.ann_sharpe.unwrap(), mean / std, epsilon = 1e-12);
    }

    #[test]
    fn fmt_stat_renders_nan_for_undefined() {
        assert_eq!(fmt_stat(None), "nan");
        assert_eq!(fmt_stat(Some(1.5)), "1.500");
        assert_eq!(fmt_stat(Some(f64::NAN)), "nan");
    }

    #[test]
    fn weekend_split_adds_two_columns() {
        let columns = build_columns(&[], true);
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Full",
                "Intraday",
                "Overnight (all)",
                "Overnight (business)",
                "Overnight (weekend)"
            ]
        );
    }
}
