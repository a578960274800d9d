//! Core domain types and logic.

pub mod bar;
pub mod table;
pub mod stats;
pub mod factor;
pub mod normalize;
pub mod signal;
pub mod backtest;
pub mod portfolio;
pub mod equity;
pub mod metrics;
pub mod pipeline;
pub mod config;
pub mod error;
