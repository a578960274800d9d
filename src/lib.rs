//! factortrader: factor signal backtester.
//!
//! Turns per-instrument price series into factor signals, lags them into
//! positions, and reports the equal-weighted portfolio's equity curve and
//! performance metrics.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
