//! CLI definition and dispatch.
//!
//! One subcommand per pipeline stage, each with a per-symbol and an
//! all-symbols variant. All-symbols runs catch per-symbol failures, log them
//! and continue; only top-level failures produce a non-zero exit.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::kibot_loader;
use crate::adapters::rollover_csv;
use crate::adapters::sqlite_store::SqliteStore;
use crate::adapters::stats_export;
use crate::domain::error::OvernightError;
use crate::domain::liquidity::{self, LiquidityFilters};
use crate::domain::refprice::{self, SessionTimes};
use crate::domain::stats::{self, StatsReport, STAT_ROWS};
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(
    name = "overnight",
    about = "Futures liquidity selection and overnight-return statistics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every store-touching subcommand.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Path to the sqlite database file (overrides [sqlite] path from --config)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Optional INI config file ([sqlite], [filters], [session] sections)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load contract bar files from a directory into the database
    LoadBars {
        /// Directory containing contract text files
        #[arg(long)]
        root_dir: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// List files but do not modify the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Import rollover rules (symbol descriptions) from a CSV file
    LoadRollover {
        /// Path to the rollover rules CSV
        #[arg(long)]
        csv: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Compute the daily liquid contract for one symbol
    Liquid {
        symbol: String,
        #[command(flatten)]
        store: StoreArgs,
        /// Compute but do not modify the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute daily liquid contracts for all symbols
    LiquidAll {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute daily reference prices for one symbol
    RefPrices {
        symbol: String,
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute daily reference prices for all symbols with liquid days
    RefPricesAll {
        /// Optional list of symbol codes (default: all with liquid days)
        #[arg(long, num_args = 0..)]
        symbols: Vec<String>,
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print return statistics for one symbol
    Stats {
        symbol: String,
        /// Start date (YYYY-MM-DD), default: first reference-price date
        #[arg(long)]
        start_date: Option<String>,
        /// End date (YYYY-MM-DD), default: last reference-price date
        #[arg(long)]
        end_date: Option<String>,
        /// Split overnight returns into business-day and weekend subsets
        #[arg(long)]
        weekend_split: bool,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Compute stats for all qualifying symbols and export CSV + SVG
    StatsAll {
        /// Minimum reference-price rows for a symbol to be included
        #[arg(long, default_value_t = 1000)]
        min_rows: usize,
        /// Directory to write results into
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::LoadBars {
            root_dir,
            store,
            dry_run,
        } => run_load_bars(&root_dir, &store, dry_run),
        Command::LoadRollover { csv, store } => run_load_rollover(&csv, &store),
        Command::Liquid {
            symbol,
            store,
            dry_run,
        } => run_liquid(&symbol, &store, dry_run),
        Command::LiquidAll { store, dry_run } => run_liquid_all(&store, dry_run),
        Command::RefPrices {
            symbol,
            store,
            dry_run,
        } => run_ref_prices(&symbol, &store, dry_run),
        Command::RefPricesAll {
            symbols,
            store,
            dry_run,
        } => run_ref_prices_all(&symbols, &store, dry_run),
        Command::Stats {
            symbol,
            start_date,
            end_date,
            weekend_split,
            store,
        } => run_stats(
            &symbol,
            start_date.as_deref(),
            end_date.as_deref(),
            weekend_split,
            &store,
        ),
        Command::StatsAll {
            min_rows,
            results_dir,
            store,
        } => run_stats_all(min_rows, &results_dir, &store),
    }
}

fn fail(err: &OvernightError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, OvernightError> {
    FileConfigAdapter::from_file(path).map_err(|e| OvernightError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Open the store from `--db`, falling back to `[sqlite] path` in `--config`.
/// The schema is created on first use.
fn open_store(args: &StoreArgs) -> Result<SqliteStore, OvernightError> {
    let store = match (&args.db, &args.config) {
        (Some(db), _) => SqliteStore::open(&db.display().to_string())?,
        (None, Some(config)) => SqliteStore::from_config(&load_config(config)?)?,
        (None, None) => {
            return Err(OvernightError::ConfigMissing {
                section: "sqlite".into(),
                key: "path (pass --db or --config)".into(),
            });
        }
    };
    store.initialize_schema()?;
    Ok(store)
}

fn load_filters(args: &StoreArgs) -> Result<LiquidityFilters, OvernightError> {
    match &args.config {
        Some(path) => LiquidityFilters::from_config(&load_config(path)?),
        None => Ok(LiquidityFilters::default()),
    }
}

fn load_session_times(args: &StoreArgs) -> Result<SessionTimes, OvernightError> {
    match &args.config {
        Some(path) => SessionTimes::from_config(&load_config(path)?),
        None => Ok(SessionTimes::default()),
    }
}

fn run_load_bars(root_dir: &PathBuf, store_args: &StoreArgs, dry_run: bool) -> ExitCode {
    if !root_dir.is_dir() {
        eprintln!(
            "error: root directory {} does not exist or is not a directory",
            root_dir.display()
        );
        return ExitCode::from(2);
    }

    if dry_run {
        eprintln!("Dry run: listing matching files in {}", root_dir.display());
        match kibot_loader::contract_files(root_dir) {
            Ok(files) => {
                for f in &files {
                    eprintln!("Found: {}", f.display());
                }
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        }
    } else {
        let store = match open_store(store_args) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        eprintln!("Starting load from {}", root_dir.display());
        match kibot_loader::load_directory(&store, root_dir) {
            Ok(count) => {
                eprintln!("Finished loading {} files", count);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        }
    }
}

fn run_load_rollover(csv: &PathBuf, store_args: &StoreArgs) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    match rollover_csv::import_rollover_rules(&store, csv) {
        Ok(count) => {
            eprintln!(
                "Inserted/updated {} rows into rollover_rules from {}",
                count,
                csv.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_liquid(symbol: &str, store_args: &StoreArgs, dry_run: bool) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let filters = match load_filters(store_args) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };
    match liquidity::compute_liquid_contracts(&store, symbol, &filters, dry_run) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn run_liquid_all(store_args: &StoreArgs, dry_run: bool) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let filters = match load_filters(store_args) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    let symbols = match store.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if symbols.is_empty() {
        eprintln!("No symbols found in the database");
        return ExitCode::SUCCESS;
    }

    eprintln!("Found {} symbols; processing...", symbols.len());
    for (i, symbol) in symbols.iter().enumerate() {
        eprintln!("({}/{}) Processing symbol {}", i + 1, symbols.len(), symbol);
        if let Err(e) = liquidity::compute_liquid_contracts(&store, symbol, &filters, dry_run) {
            eprintln!("warning: error processing symbol {symbol} ({e}); continuing");
        }
    }
    eprintln!("Finished processing all symbols");
    ExitCode::SUCCESS
}

fn run_ref_prices(symbol: &str, store_args: &StoreArgs, dry_run: bool) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let times = match load_session_times(store_args) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    match refprice::process_symbol(&store, symbol, &times, dry_run, store_args.verbose) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn run_ref_prices_all(symbols: &[String], store_args: &StoreArgs, dry_run: bool) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let times = match load_session_times(store_args) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let symbols: Vec<String> = if symbols.is_empty() {
        match store.liquid_symbols() {
            Ok(s) => s,
            Err(e) => return fail(&e),
        }
    } else {
        symbols.to_vec()
    };
    if symbols.is_empty() {
        eprintln!("No symbols found in liquid_contract_daily");
        return ExitCode::SUCCESS;
    }

    eprintln!("Will process {} symbols", symbols.len());
    let mut total = 0usize;
    for symbol in &symbols {
        eprintln!("Processing symbol {symbol}");
        match refprice::process_symbol(&store, symbol, &times, dry_run, store_args.verbose) {
            Ok(count) => total += count,
            Err(e) => eprintln!("warning: failed processing symbol {symbol} ({e}); continuing"),
        }
    }
    eprintln!(
        "Finished: {} rows {} (summed across symbols)",
        total,
        if dry_run { "would be written" } else { "written" }
    );
    ExitCode::SUCCESS
}

fn parse_date_arg(value: &str, name: &str) -> Result<NaiveDate, OvernightError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| OvernightError::ConfigInvalid {
        section: "args".into(),
        key: name.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

/// Resolve the effective date range: explicit arguments win, otherwise the
/// symbol's full reference-price range. No rows at all is a `NoData` failure.
fn resolve_date_range(
    store: &dyn StorePort,
    symbol: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), OvernightError> {
    let (range_start, range_end) = match store.reference_price_range(symbol)? {
        Some((min, max, _)) => (min, max),
        None => {
            return Err(OvernightError::NoData {
                symbol: symbol.to_string(),
            });
        }
    };

    let start = match start {
        Some(s) => parse_date_arg(s, "start_date")?,
        None => range_start,
    };
    let end = match end {
        Some(s) => parse_date_arg(s, "end_date")?,
        None => range_end,
    };
    Ok((start, end))
}

fn print_stats_table(report: &StatsReport) {
    const LABEL_WIDTH: usize = 20;
    let widths: Vec<usize> = report
        .columns
        .iter()
        .map(|(name, _)| name.len().max(9) + 2)
        .collect();

    println!("{}", report.title);
    print!("{:LABEL_WIDTH$}", "");
    for ((name, _), &width) in report.columns.iter().zip(&widths) {
        print!("{name:>width$}");
    }
    println!();

    for (idx, label) in STAT_ROWS.iter().enumerate() {
        print!("{label:<LABEL_WIDTH$}");
        for ((_, series), &width) in report.columns.iter().zip(&widths) {
            print!("{:>width$}", stats::fmt_stat(series.values()[idx]));
        }
        println!();
    }
}

fn run_stats(
    symbol: &str,
    start: Option<&str>,
    end: Option<&str>,
    weekend_split: bool,
    store_args: &StoreArgs,
) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let (start, end) = match resolve_date_range(&store, symbol, start, end) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    match stats::compute_reference_stats(&store, symbol, start, end, weekend_split) {
        Ok(report) => {
            print_stats_table(&report);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_stats_all(min_rows: usize, results_dir: &PathBuf, store_args: &StoreArgs) -> ExitCode {
    let store = match open_store(store_args) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if let Err(e) = std::fs::create_dir_all(results_dir) {
        return fail(&OvernightError::Io(e));
    }
    eprintln!("Writing results into {}", results_dir.display());

    let candidates = match store.reference_price_counts(min_rows) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!(
        "Found {} candidate symbols (min_rows={})",
        candidates.len(),
        min_rows
    );

    for (symbol, count) in &candidates {
        eprintln!("Processing {symbol} ({count} rows)...");
        if let Err(e) = export_symbol_stats(&store, symbol, results_dir) {
            eprintln!("warning: failed to compute stats for {symbol} ({e}); skipping");
        }
    }

    eprintln!("All done");
    ExitCode::SUCCESS
}

fn export_symbol_stats(
    store: &SqliteStore,
    symbol: &str,
    results_dir: &std::path::Path,
) -> Result<(), OvernightError> {
    let (start, end) = resolve_date_range(store, symbol, None, None)?;
    let report = stats::compute_reference_stats(store, symbol, start, end, true)?;

    // "<description> (<symbol>) stats" -> description
    let description = report
        .title
        .rsplit_once(" (")
        .map(|(d, _)| d)
        .unwrap_or(symbol);
    let base_name = stats_export::safe_filename(&format!("{symbol}_{description}"));

    let csv_path = results_dir.join(format!("{base_name}.csv"));
    stats_export::write_stats_csv(&csv_path, &report)?;
    eprintln!("Wrote stats CSV: {}", csv_path.display());

    let series = stats::cumulative_series(&report.returns, true);
    let svg_path = results_dir.join(format!("{base_name}.svg"));
    stats_export::write_cumulative_svg(&svg_path, &report.title, &series)?;
    eprintln!("Saved chart SVG: {}", svg_path.display());

    Ok(())
}
