//! Concrete adapter implementations for ports.

pub mod sqlite_store;
pub mod file_config_adapter;
pub mod kibot_loader;
pub mod rollover_csv;
pub mod stats_export;
