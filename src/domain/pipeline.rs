//! End-to-end stages from prices to performance.
//!
//! ```text
//! prices -> factors -> normalize_and_signal -> prepare_and_aggregate -> equity_and_metrics
//! ```
//!
//! Each stage takes its input by reference and returns new values; nothing
//! is mutated in place.

use crate::domain::backtest::prepare_backtest;
use crate::domain::equity::{build_equity_curve, EquityCurve};
use crate::domain::error::FactorError;
use crate::domain::factor::{compute_factor, compute_factors, FactorSpec};
use crate::domain::metrics::Metrics;
use crate::domain::normalize::{winsorize, zscore, WinsorBounds};
use crate::domain::portfolio::{calculate_strategy_return, Aggregation, PortfolioReturns};
use crate::domain::signal::{generate_signals, SignalRule};
use crate::domain::table::{z_column, ObservationTable, SIGNAL};
use crate::ports::data_port::DataPort;
use crate::ports::factor_cache_port::{FactorCachePort, FactorColumn};
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalSettings {
    pub rule: SignalRule,
    pub bounds: WinsorBounds,
}

/// Loads every code into one table with a `close` column.
///
/// A code that fails to load or has no bars in range is skipped with a
/// warning. Fails with `NoData` only when no code yields any bar.
pub fn load_price_table(
    data: &dyn DataPort,
    codes: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ObservationTable, FactorError> {
    let mut bars = Vec::new();
    for code in codes {
        match data.fetch_bars(code, start_date, end_date) {
            Ok(b) if b.is_empty() => {
                tracing::warn!(code = %code, %start_date, %end_date, "no bars in range, skipping");
            }
            Ok(b) => {
                tracing::debug!(code = %code, bars = b.len(), "fetched bars");
                bars.extend(b);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "failed to load, skipping");
            }
        }
    }

    if bars.is_empty() {
        return Err(FactorError::NoData {
            code: codes.join(","),
        });
    }
    ObservationTable::from_bars(&bars)
}

/// Merges cached factor columns into the table by (code, datetime).
///
/// Returns the extended table and the factors that had no usable cache
/// entry. A cached column missing any row of the table counts as a miss.
pub fn attach_factors(
    table: &ObservationTable,
    factors: &[FactorSpec],
    cache: &dyn FactorCachePort,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(ObservationTable, Vec<FactorSpec>), FactorError> {
    let mut out = table.clone();
    let mut uncached = Vec::new();

    for spec in factors {
        let name = spec.column_name();
        match cache.load(&name, start_date, end_date)? {
            Some(column) if covers(&column, table) => {
                out = out.join_column(&name, column.iter())?;
            }
            Some(_) => {
                tracing::warn!(factor = %name, "cached factor does not cover every row, recomputing");
                uncached.push(*spec);
            }
            None => uncached.push(*spec),
        }
    }

    Ok((out, uncached))
}

/// True when the cached column has an entry for every (code, datetime) row.
fn covers(column: &FactorColumn, table: &ObservationTable) -> bool {
    let keys: HashSet<(&str, NaiveDate)> = column.iter().map(|(code, date, _)| (code, date)).collect();
    table
        .rows()
        .iter()
        .all(|r| keys.contains(&(r.code.as_str(), r.datetime)))
}

fn factor_column(table: &ObservationTable, name: &str) -> Result<FactorColumn, FactorError> {
    let col = table.column_index(name)?;
    Ok(FactorColumn {
        entries: table
            .rows()
            .iter()
            .map(|r| (r.code.clone(), r.datetime, r.value(col)))
            .collect(),
    })
}

/// Adds every factor column, reading from and filling the cache when given.
pub fn build_factor_table(
    table: &ObservationTable,
    factors: &[FactorSpec],
    cache: Option<&dyn FactorCachePort>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ObservationTable, FactorError> {
    let Some(cache) = cache else {
        return compute_factors(table, factors);
    };

    let (mut out, uncached) = attach_factors(table, factors, cache, start_date, end_date)?;
    tracing::info!(
        cached = factors.len() - uncached.len(),
        computed = uncached.len(),
        "resolved factors"
    );

    for spec in &uncached {
        out = compute_factor(&out, spec)?;
        let name = spec.column_name();
        cache.save(&name, start_date, end_date, &factor_column(&out, &name)?)?;
    }

    Ok(out)
}

/// Winsorizes and z-scores the factor columns per code, then adds `signal`
/// evaluated on the `<factor>_z` columns.
pub fn normalize_and_signal<S: AsRef<str>>(
    table: &ObservationTable,
    factor_columns: &[S],
    settings: &SignalSettings,
) -> Result<ObservationTable, FactorError> {
    let winsorized = winsorize(table, factor_columns, settings.bounds)?;
    let normalized = zscore(&winsorized, factor_columns)?;
    let z_columns: Vec<String> = factor_columns
        .iter()
        .map(|c| z_column(c.as_ref()))
        .collect();
    generate_signals(&normalized, &z_columns, settings.rule)
}

/// Adds `return`, `position` and `strategy_return`, and aggregates the
/// date-level portfolio return series.
pub fn prepare_and_aggregate(
    table: &ObservationTable,
    aggregation: Aggregation,
) -> Result<(ObservationTable, PortfolioReturns), FactorError> {
    let prepared = prepare_backtest(table)?;
    let (with_returns, portfolio) = calculate_strategy_return(&prepared, aggregation)?;
    tracing::info!(
        rows = with_returns.len(),
        dates = portfolio.len(),
        "prepared backtest"
    );
    Ok((with_returns, portfolio))
}

pub fn equity_and_metrics(
    returns: &PortfolioReturns,
    initial_capital: f64,
    risk_free_rate: f64,
) -> (EquityCurve, Metrics) {
    let curve = build_equity_curve(returns, initial_capital);
    let metrics = Metrics::compute(returns, &curve, risk_free_rate);
    (curve, metrics)
}

/// Indices of rows holding a long or short signal.
pub fn active_signal_rows(table: &ObservationTable) -> Result<Vec<usize>, FactorError> {
    let signal_col = table.column_index(SIGNAL)?;
    Ok(table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.value(signal_col).is_some_and(|s| s != 0.0))
        .map(|(i, _)| i)
        .collect())
}
