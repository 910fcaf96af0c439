//! Kibot text-file bar loader.
//!
//! Walks a directory of per-contract text files
//! (`<SYMBOL><MONTH><YY>.txt`, rows `MM/DD/YYYY,HH:MM,open,high,low,close,volume`)
//! and loads them into the store. Files whose stem does not parse as a dated
//! contract (continuous series) are skipped. After each file the contract's
//! last trading date is refreshed from its newest bar.

use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::bar::Bar;
use crate::domain::contract::parse_contract_filename;
use crate::domain::error::OvernightError;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Parse one Kibot data line into a bar for `contract_id`.
pub fn parse_bar_line(
    line: &str,
    contract_id: i64,
    file: &str,
    line_no: usize,
) -> Result<Bar, OvernightError> {
    let bad = |reason: String| OvernightError::BarParse {
        file: file.to_string(),
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 7 {
        return Err(bad(format!("expected 7 fields, got {}", fields.len())));
    }

    let timestamp =
        NaiveDateTime::parse_from_str(&format!("{} {}", fields[0], fields[1]), "%m/%d/%Y %H:%M")
            .map_err(|e| bad(format!("invalid timestamp: {e}")))?;

    let price = |idx: usize, name: &str| -> Result<f64, OvernightError> {
        fields[idx]
            .parse()
            .map_err(|e| bad(format!("invalid {name} value: {e}")))
    };

    let volume = match fields[6].trim() {
        "" => None,
        v => Some(
            v.parse::<i64>()
                .map_err(|e| bad(format!("invalid volume value: {e}")))?,
        ),
    };

    Ok(Bar {
        contract_id,
        timestamp,
        open: price(2, "open")?,
        high: price(3, "high")?,
        low: price(4, "low")?,
        close: price(5, "close")?,
        volume,
    })
}

/// Contract text files under `root`, sorted by name.
pub fn contract_files(root: &Path) -> Result<Vec<PathBuf>, OvernightError> {
    let mut files: Vec<PathBuf> = fs::read_dir(root)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every parseable contract file under `root` into the store.
///
/// Returns the number of files loaded. A file that fails to parse aborts the
/// load; partially written bars are harmless because a re-run upserts them.
pub fn load_directory(store: &SqliteStore, root: &Path) -> Result<usize, OvernightError> {
    let mut loaded = 0;

    for path in contract_files(root)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some((symbol_code, month_code, year)) = parse_contract_filename(&file_name) else {
            continue; // continuous contract or unrelated file
        };

        store.ensure_symbol(&symbol_code)?;
        let contract_id = store.ensure_contract(&symbol_code, month_code, year, &file_name)?;

        let content = fs::read_to_string(&path)?;
        let mut bars = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            bars.push(parse_bar_line(line, contract_id, &file_name, idx + 1)?);
        }

        store.insert_bars(&bars)?;
        store.refresh_last_trade_date(contract_id)?;
        eprintln!("Loaded {} bars from {}", bars.len(), file_name);
        loaded += 1;
    }

    Ok(loaded)
}
