//! Core domain types and logic.

pub mod market_chart;
pub mod indicator;
pub mod series;
pub mod signal;
pub mod execution;
pub mod universe;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod scan;
pub mod metrics;
pub mod run_record;
pub mod strategy;
pub mod config_validation;
pub mod error;
