//! CLI tests: argument parsing, config-driven thresholds, exit-code mapping,
//! and a full load -> liquid -> ref-prices -> stats-all run against a real
//! database file on disk.

mod common;

use clap::Parser;
use common::*;
use overnight::adapters::file_config_adapter::FileConfigAdapter;
use overnight::adapters::sqlite_store::SqliteStore;
use overnight::cli::{run, Cli, Command};
use overnight::domain::error::OvernightError;
use overnight::domain::liquidity::LiquidityFilters;
use overnight::domain::refprice::SessionTimes;
use overnight::ports::store_port::StorePort;
use std::fs;
use tempfile::TempDir;

mod argument_parsing {
    use super::*;

    #[test]
    fn load_bars_requires_root_dir() {
        assert!(Cli::try_parse_from(["overnight", "load-bars"]).is_err());
        assert!(Cli::try_parse_from([
            "overnight",
            "load-bars",
            "--root-dir",
            "/data/kibot",
            "--db",
            "/tmp/f.sqlite3"
        ])
        .is_ok());
    }

    #[test]
    fn stats_flags_parse() {
        let cli = Cli::try_parse_from([
            "overnight",
            "stats",
            "ES",
            "--start-date",
            "2026-01-01",
            "--end-date",
            "2026-06-30",
            "--weekend-split",
            "--db",
            "/tmp/f.sqlite3",
        ])
        .unwrap();
        match cli.command {
            Command::Stats {
                symbol,
                start_date,
                end_date,
                weekend_split,
                ..
            } => {
                assert_eq!(symbol, "ES");
                assert_eq!(start_date.as_deref(), Some("2026-01-01"));
                assert_eq!(end_date.as_deref(), Some("2026-06-30"));
                assert!(weekend_split);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stats_all_has_defaults() {
        let cli =
            Cli::try_parse_from(["overnight", "stats-all", "--db", "/tmp/f.sqlite3"]).unwrap();
        match cli.command {
            Command::StatsAll {
                min_rows,
                results_dir,
                ..
            } => {
                assert_eq!(min_rows, 1000);
                assert_eq!(results_dir.to_str(), Some("results"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

mod config_thresholds {
    use super::*;

    #[test]
    fn filters_read_from_ini() {
        let adapter = FileConfigAdapter::from_string(
            "[filters]\n\
             max_days_to_last_day = 60\n\
             min_daily_volume = 2000\n\
             required_open_start = 09:00\n\
             required_open_end = 09:45\n",
        )
        .unwrap();
        let filters = LiquidityFilters::from_config(&adapter).unwrap();
        assert_eq!(filters.max_days_to_last_day, 60);
        assert_eq!(filters.min_daily_volume, 2000);
        assert_eq!(filters.required_open_start, hhmm(9, 0));
        assert_eq!(filters.required_open_end, hhmm(9, 45));
    }

    #[test]
    fn missing_filter_keys_use_defaults() {
        let adapter = FileConfigAdapter::from_string("[filters]\n").unwrap();
        assert_eq!(
            LiquidityFilters::from_config(&adapter).unwrap(),
            LiquidityFilters::default()
        );
    }

    #[test]
    fn bad_open_window_time_is_config_invalid() {
        let adapter =
            FileConfigAdapter::from_string("[filters]\nrequired_open_start = ten\n").unwrap();
        let err = LiquidityFilters::from_config(&adapter).unwrap_err();
        assert!(matches!(err, OvernightError::ConfigInvalid { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn session_times_read_from_ini() {
        let adapter = FileConfigAdapter::from_string(
            "[session]\nopen_time = 08:30\nclose_time = 15:00\n",
        )
        .unwrap();
        let times = SessionTimes::from_config(&adapter).unwrap();
        assert_eq!(times.open, hhmm(8, 30));
        assert_eq!(times.close, hhmm(15, 0));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn mapping_by_error_family() {
        let io = OvernightError::Io(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 1);

        let missing = OvernightError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        };
        assert_eq!(missing.exit_code(), 2);

        let no_data = OvernightError::NoData {
            symbol: "ES".into(),
        };
        assert_eq!(no_data.exit_code(), 2);

        let query = OvernightError::DatabaseQuery {
            reason: "syntax".into(),
        };
        assert_eq!(query.exit_code(), 3);

        let parse = OvernightError::BarParse {
            file: "ESH26.txt".into(),
            line: 3,
            reason: "short".into(),
        };
        assert_eq!(parse.exit_code(), 4);
    }
}

mod full_run {
    use super::*;

    fn run_command(args: &[&str]) {
        let mut argv = vec!["overnight"];
        argv.extend_from_slice(args);
        let _ = run(Cli::try_parse_from(argv).unwrap());
    }

    #[test]
    fn load_liquid_refprices_stats_all() {
        let data_dir = TempDir::new().unwrap();
        fs::write(
            data_dir.path().join("ESH26.txt"),
            "01/05/2026,09:30,100.00,100.75,99.50,100.50,300\n\
             01/05/2026,10:00,100.50,101.00,100.25,100.75,2000\n\
             01/05/2026,15:55,101.00,101.50,100.75,101.25,400\n\
             01/06/2026,09:30,101.25,102.00,101.00,101.75,300\n\
             01/06/2026,10:05,101.75,102.25,101.50,102.00,2500\n\
             01/06/2026,15:55,102.00,102.50,101.75,102.25,400\n\
             03/19/2026,15:55,103.00,103.50,102.75,103.25,100\n",
        )
        .unwrap();

        let work_dir = TempDir::new().unwrap();
        let db_path = work_dir.path().join("futures.sqlite3");
        let db = db_path.to_str().unwrap();
        let results_dir = work_dir.path().join("results");
        let results = results_dir.to_str().unwrap();

        run_command(&[
            "load-bars",
            "--root-dir",
            data_dir.path().to_str().unwrap(),
            "--db",
            db,
        ]);
        run_command(&["liquid", "ES", "--db", db]);
        run_command(&["ref-prices", "ES", "--db", db]);
        run_command(&[
            "stats-all",
            "--min-rows",
            "1",
            "--results-dir",
            results,
            "--db",
            db,
        ]);

        let store = SqliteStore::open(db).unwrap();

        let days = store.liquid_days("ES").unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].trade_date, date("2026-01-05"));
        assert_eq!(days[1].trade_date, date("2026-01-06"));
        // The March session has no open-window bar and never qualifies.

        let prices = store
            .reference_prices("ES", date("2026-01-01"), date("2026-12-31"))
            .unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].price_open, Some(100.00));
        assert_eq!(prices[0].price_close, Some(101.25));
        assert_eq!(prices[0].prev_close, None);
        assert_eq!(prices[1].prev_close, Some(101.25));

        // No rollover rules loaded: the description falls back to the code.
        let csv = results_dir.join("ES_ES.csv");
        let svg = results_dir.join("ES_ES.svg");
        assert!(csv.is_file());
        assert!(svg.is_file());
        let content = fs::read_to_string(csv).unwrap();
        assert!(content.starts_with("ES (ES) stats"));
    }

    #[test]
    fn dry_run_leaves_database_untouched() {
        let data_dir = TempDir::new().unwrap();
        fs::write(
            data_dir.path().join("ESH26.txt"),
            "01/05/2026,10:00,100.00,101.00,99.50,100.50,2000\n",
        )
        .unwrap();

        let work_dir = TempDir::new().unwrap();
        let db_path = work_dir.path().join("futures.sqlite3");
        let db = db_path.to_str().unwrap();

        run_command(&[
            "load-bars",
            "--root-dir",
            data_dir.path().to_str().unwrap(),
            "--db",
            db,
            "--dry-run",
        ]);

        // Dry run lists files without opening the database.
        assert!(!db_path.exists());
    }
}
