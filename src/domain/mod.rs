//! Core domain types and pipeline logic.

pub mod bar;
pub mod contract;
pub mod liquidity;
pub mod refprice;
pub mod returns;
pub mod stats;
pub mod error;
