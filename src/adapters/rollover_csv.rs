//! Rollover-rules CSV import.
//!
//! Expected columns: `Symbol,Description,RolloverDays,RolloverType`, header
//! row optional. Only the description is consumed downstream (report
//! headers); the remaining columns are carried for parity with the source
//! data.

use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::error::OvernightError;
use std::path::Path;

pub type RolloverRow = (String, String, i64, String);

/// Parse the rollover CSV into upsert-ready rows. Blank symbols and a
/// leading header row are skipped; an unparseable days column defaults to 0.
pub fn parse_rollover_csv(path: &Path) -> Result<Vec<RolloverRow>, OvernightError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| OvernightError::Io(std::io::Error::other(e)))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| OvernightError::Io(std::io::Error::other(e)))?;

        let symbol = record.get(0).unwrap_or("").trim().to_string();
        if symbol.is_empty() {
            continue;
        }
        if idx == 0 && matches!(symbol.to_lowercase().as_str(), "symbol" | "symbol_code") {
            continue;
        }

        let description = record.get(1).unwrap_or("").trim().to_string();
        let days = record
            .get(2)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let rtype = record.get(3).unwrap_or("").trim().to_string();

        rows.push((symbol, description, days, rtype));
    }

    Ok(rows)
}

/// Import the rollover CSV at `path`, returning the number of rows upserted.
pub fn import_rollover_rules(store: &SqliteStore, path: &Path) -> Result<usize, OvernightError> {
    let rows = parse_rollover_csv(path)?;
    if rows.is_empty() {
        return Err(OvernightError::NoData {
            symbol: format!("rollover rules in {}", path.display()),
        });
    }
    store.upsert_rollover_rules(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::store_port::StorePort;
    use tempfile::TempDir;

    fn write_csv(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("futs_roll_info.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn parses_rows_and_skips_header() {
        let (_dir, path) = write_csv(
            "Symbol,Description,RolloverDays,RolloverType\n\
             ES,E-mini S&P 500,8,volume\n\
             GC,Gold,3,calendar\n",
        );
        let rows = parse_rollover_csv(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                ("ES".into(), "E-mini S&P 500".into(), 8, "volume".into()),
                ("GC".into(), "Gold".into(), 3, "calendar".into()),
            ]
        );
    }

    #[test]
    fn bad_days_column_defaults_to_zero() {
        let (_dir, path) = write_csv("ES,E-mini,many,volume\n");
        let rows = parse_rollover_csv(&path).unwrap();
        assert_eq!(rows[0].2, 0);
    }

    #[test]
    fn short_rows_are_tolerated() {
        let (_dir, path) = write_csv("ES,E-mini\n");
        let rows = parse_rollover_csv(&path).unwrap();
        assert_eq!(rows[0], ("ES".into(), "E-mini".into(), 0, "".into()));
    }

    #[test]
    fn import_writes_descriptions() {
        let (_dir, path) = write_csv("ES,E-mini S&P 500,8,volume\n");
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let count = import_rollover_rules(&store, &path).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            store.symbol_description("ES").unwrap(),
            Some("E-mini S&P 500".to_string())
        );
    }

    #[test]
    fn empty_file_is_no_data() {
        let (_dir, path) = write_csv("");
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        assert!(matches!(
            import_rollover_rules(&store, &path),
            Err(OvernightError::NoData { .. })
        ));
    }
}
