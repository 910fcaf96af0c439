//! SQLite store adapter.
//!
//! Timestamps are stored as TEXT `YYYY-MM-DD HH:MM`; time-of-day matching
//! goes through `strftime('%H:%M', timestamp)` so seconds or formatting
//! differences never break exact-match lookups.

use crate::domain::bar::Bar;
use crate::domain::error::OvernightError;
use crate::domain::liquidity::{DailyVolume, LiquidDay};
use crate::domain::refprice::ReferencePrice;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M";
const HHMM_FMT: &str = "%H:%M";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> OvernightError {
    OvernightError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> OvernightError {
    OvernightError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, OvernightError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| OvernightError::Database {
        reason: format!("invalid date {s:?}: {e}"),
    })
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, OvernightError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, OvernightError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| OvernightError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        Self::open(&db_path)
    }

    pub fn in_memory() -> Result<Self, OvernightError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS symbols (
                symbol_code TEXT PRIMARY KEY,
                description TEXT
            );
            CREATE TABLE IF NOT EXISTS contracts (
                contract_id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol_code TEXT NOT NULL,
                month_code TEXT NOT NULL,
                year INTEGER NOT NULL,
                last_trade_date TEXT,
                source_filename TEXT UNIQUE
            );
            CREATE TABLE IF NOT EXISTS bars_5min (
                contract_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER,
                PRIMARY KEY (contract_id, timestamp)
            );
            CREATE INDEX IF NOT EXISTS idx_bars_5min_timestamp ON bars_5min(timestamp);
            CREATE TABLE IF NOT EXISTS liquid_contract_daily (
                symbol_code TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                contract_id INTEGER NOT NULL,
                PRIMARY KEY (symbol_code, trade_date)
            );
            CREATE TABLE IF NOT EXISTS daily_reference_prices (
                symbol_code TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                price_open REAL,
                price_close REAL,
                prev_close REAL,
                PRIMARY KEY (symbol_code, trade_date)
            );
            CREATE TABLE IF NOT EXISTS rollover_rules (
                symbol_code TEXT PRIMARY KEY,
                description TEXT,
                rollover_days INTEGER,
                rollover_type TEXT
            );",
        )
        .map_err(query_err)?;
        Ok(())
    }

    pub fn ensure_symbol(&self, symbol_code: &str) -> Result<(), OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute(
            "INSERT INTO symbols (symbol_code, description) VALUES (?1, ?1)
             ON CONFLICT(symbol_code) DO NOTHING",
            params![symbol_code],
        )
        .map_err(query_err)?;
        Ok(())
    }

    /// Insert or refresh a contract row keyed by its source filename and
    /// return its contract_id.
    pub fn ensure_contract(
        &self,
        symbol_code: &str,
        month_code: char,
        year: i32,
        source_filename: &str,
    ) -> Result<i64, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let id: i64 = conn
            .query_row(
                "INSERT INTO contracts (symbol_code, month_code, year, source_filename)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(source_filename) DO UPDATE SET
                     symbol_code = excluded.symbol_code,
                     month_code = excluded.month_code,
                     year = excluded.year
                 RETURNING contract_id",
                params![symbol_code, month_code.to_string(), year, source_filename],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(id)
    }

    pub fn insert_bars(&self, bars: &[Bar]) -> Result<(), OvernightError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO bars_5min
                     (contract_id, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.contract_id,
                    bar.timestamp.format(TIMESTAMP_FMT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    /// Set a contract's last trading date to the date of its newest bar.
    /// No-op for contracts with no bars.
    pub fn refresh_last_trade_date(&self, contract_id: i64) -> Result<(), OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute(
            "UPDATE contracts
             SET last_trade_date = (
                 SELECT MAX(date(timestamp)) FROM bars_5min WHERE contract_id = ?1
             )
             WHERE contract_id = ?1",
            params![contract_id],
        )
        .map_err(query_err)?;
        Ok(())
    }

    pub fn upsert_rollover_rules(
        &self,
        rows: &[(String, String, i64, String)],
    ) -> Result<usize, OvernightError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for (symbol, description, days, rtype) in rows {
            tx.execute(
                "INSERT INTO rollover_rules (symbol_code, description, rollover_days, rollover_type)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(symbol_code) DO UPDATE SET
                     description = excluded.description,
                     rollover_days = excluded.rollover_days,
                     rollover_type = excluded.rollover_type",
                params![symbol, description, days, rtype],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(rows.len())
    }

    fn single_price(
        &self,
        sql: &str,
        contract_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let mut rows = stmt
            .query(params![
                contract_id,
                date.format(DATE_FMT).to_string(),
                time.format(HHMM_FMT).to_string()
            ])
            .map_err(query_err)?;
        match rows.next().map_err(query_err)? {
            Some(row) => Ok(Some(row.get(0).map_err(query_err)?)),
            None => Ok(None),
        }
    }
}

impl StorePort for SqliteStore {
    fn list_symbols(&self) -> Result<Vec<String>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT symbol_code FROM symbols ORDER BY symbol_code")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;
        Ok(rows)
    }

    fn liquid_symbols(&self) -> Result<Vec<String>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT symbol_code FROM liquid_contract_daily ORDER BY symbol_code",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;
        Ok(rows)
    }

    fn open_window_dates(
        &self,
        symbol: &str,
        window_start: NaiveTime,
        window_end: NaiveTime,
    ) -> Result<Vec<NaiveDate>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT date(b.timestamp) AS trade_date
                 FROM bars_5min b
                 JOIN contracts c ON c.contract_id = b.contract_id
                 WHERE c.symbol_code = ?1
                   AND strftime('%H:%M', b.timestamp) >= ?2
                   AND strftime('%H:%M', b.timestamp) < ?3
                 ORDER BY trade_date",
            )
            .map_err(query_err)?;
        let dates = stmt
            .query_map(
                params![
                    symbol,
                    window_start.format(HHMM_FMT).to_string(),
                    window_end.format(HHMM_FMT).to_string()
                ],
                |row| row.get::<_, String>(0),
            )
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;
        dates.iter().map(|s| parse_date(s)).collect()
    }

    fn daily_contract_volumes(&self, symbol: &str) -> Result<Vec<DailyVolume>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT date(b.timestamp) AS trade_date,
                        b.contract_id,
                        SUM(COALESCE(b.volume, 0)) AS vol_sum,
                        c.last_trade_date
                 FROM bars_5min b
                 JOIN contracts c ON c.contract_id = b.contract_id
                 WHERE c.symbol_code = ?1
                 GROUP BY trade_date, b.contract_id
                 ORDER BY trade_date, b.contract_id",
            )
            .map_err(query_err)?;
        let raw = stmt
            .query_map(params![symbol], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        let mut volumes = Vec::with_capacity(raw.len());
        for (trade_date, contract_id, volume, last_trade_date) in raw {
            volumes.push(DailyVolume {
                trade_date: parse_date(&trade_date)?,
                contract_id,
                volume,
                last_trade_date: last_trade_date.as_deref().map(parse_date).transpose()?,
            });
        }
        Ok(volumes)
    }

    fn upsert_liquid_days(&self, symbol: &str, days: &[LiquidDay]) -> Result<(), OvernightError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for day in days {
            tx.execute(
                "INSERT OR REPLACE INTO liquid_contract_daily
                     (symbol_code, trade_date, contract_id)
                 VALUES (?1, ?2, ?3)",
                params![
                    symbol,
                    day.trade_date.format(DATE_FMT).to_string(),
                    day.contract_id
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn liquid_days(&self, symbol: &str) -> Result<Vec<LiquidDay>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT trade_date, contract_id
                 FROM liquid_contract_daily
                 WHERE symbol_code = ?1
                 ORDER BY trade_date",
            )
            .map_err(query_err)?;
        let raw = stmt
            .query_map(params![symbol], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        raw.into_iter()
            .map(|(date, contract_id)| {
                Ok(LiquidDay {
                    trade_date: parse_date(&date)?,
                    contract_id,
                })
            })
            .collect()
    }

    fn open_at(
        &self,
        contract_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError> {
        self.single_price(
            "SELECT open FROM bars_5min
             WHERE contract_id = ?1
               AND date(timestamp) = ?2
               AND strftime('%H:%M', timestamp) = ?3
             LIMIT 1",
            contract_id,
            date,
            time,
        )
    }

    fn close_before(
        &self,
        contract_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<f64>, OvernightError> {
        // Strict comparison: a bar starting exactly at `time` closes five
        // minutes later and must not stand in for the price at `time`.
        self.single_price(
            "SELECT close FROM bars_5min
             WHERE contract_id = ?1
               AND date(timestamp) = ?2
               AND strftime('%H:%M', timestamp) < ?3
             ORDER BY timestamp DESC
             LIMIT 1",
            contract_id,
            date,
            time,
        )
    }

    fn upsert_reference_prices(&self, rows: &[ReferencePrice]) -> Result<usize, OvernightError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO daily_reference_prices
                     (symbol_code, trade_date, price_open, price_close, prev_close)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.symbol_code,
                    row.trade_date.format(DATE_FMT).to_string(),
                    row.price_open,
                    row.price_close,
                    row.prev_close
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(rows.len())
    }

    fn reference_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ReferencePrice>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT trade_date, price_open, price_close, prev_close
                 FROM daily_reference_prices
                 WHERE symbol_code = ?1 AND trade_date BETWEEN ?2 AND ?3
                 ORDER BY trade_date",
            )
            .map_err(query_err)?;
        let raw = stmt
            .query_map(
                params![
                    symbol,
                    start.format(DATE_FMT).to_string(),
                    end.format(DATE_FMT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                    ))
                },
            )
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        raw.into_iter()
            .map(|(date, price_open, price_close, prev_close)| {
                Ok(ReferencePrice {
                    symbol_code: symbol.to_string(),
                    trade_date: parse_date(&date)?,
                    price_open,
                    price_close,
                    prev_close,
                })
            })
            .collect()
    }

    fn reference_price_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(trade_date), MAX(trade_date), COUNT(*)
                 FROM daily_reference_prices
                 WHERE symbol_code = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => Ok(Some((
                parse_date(&min)?,
                parse_date(&max)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }

    fn reference_price_counts(
        &self,
        min_rows: usize,
    ) -> Result<Vec<(String, usize)>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol_code, COUNT(*) AS cnt
                 FROM daily_reference_prices
                 GROUP BY symbol_code
                 HAVING cnt >= ?1
                 ORDER BY symbol_code",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![min_rows as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        Ok(rows)
    }

    fn symbol_description(&self, symbol: &str) -> Result<Option<String>, OvernightError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT description FROM rollover_rules WHERE symbol_code = ?1")
            .map_err(query_err)?;
        let mut rows = stmt.query(params![symbol]).map_err(query_err)?;
        match rows.next().map_err(query_err)? {
            Some(row) => Ok(row.get(0).map_err(query_err)?),
            None => Ok(None),
        }
    }
}
