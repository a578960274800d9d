//! Per-instrument factor normalization: winsorization and z-scoring.
//!
//! Both transforms partition rows by `code` and never read across groups.
//! Missing cells stay missing.

use crate::domain::error::FactorError;
use crate::domain::stats::{mean, quantile_sorted, sample_std};
use crate::domain::table::{z_column, ObservationTable};
use std::collections::BTreeMap;

/// Percentile range used for clipping, as fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinsorBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for WinsorBounds {
    fn default() -> Self {
        Self {
            lower: 0.01,
            upper: 0.99,
        }
    }
}

impl WinsorBounds {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.lower)
            && (0.0..=1.0).contains(&self.upper)
            && self.lower < self.upper
    }
}

/// Clip limits resolved per factor column and per code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinsorLimits {
    by_column: BTreeMap<String, BTreeMap<String, (f64, f64)>>,
}

impl WinsorLimits {
    pub fn get(&self, column: &str, code: &str) -> Option<(f64, f64)> {
        self.by_column.get(column)?.get(code).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.by_column.keys().map(String::as_str)
    }
}

/// Computes the lower/upper percentile of each code's non-missing values.
/// Codes with no values for a column get no entry.
pub fn winsor_limits<S: AsRef<str>>(
    table: &ObservationTable,
    factor_columns: &[S],
    bounds: WinsorBounds,
) -> Result<WinsorLimits, FactorError> {
    let indices = table.require_columns(factor_columns)?;
    let groups = table.groups();
    let mut limits = WinsorLimits::default();

    for (name, &col) in factor_columns.iter().zip(&indices) {
        let per_code = limits.by_column.entry(name.as_ref().to_string()).or_default();
        for (code, rows) in &groups {
            let mut present: Vec<f64> = rows
                .iter()
                .filter_map(|&i| table.rows()[i].value(col))
                .collect();
            present.sort_by(f64::total_cmp);
            if let (Some(lo), Some(hi)) = (
                quantile_sorted(&present, bounds.lower),
                quantile_sorted(&present, bounds.upper),
            ) {
                per_code.insert(code.to_string(), (lo, hi));
            }
        }
    }

    Ok(limits)
}

/// Clips every value of the limited columns into its code's range.
pub fn clip_to_limits(
    table: &ObservationTable,
    limits: &WinsorLimits,
) -> Result<ObservationTable, FactorError> {
    let names: Vec<&str> = limits.columns().collect();
    let indices = table.require_columns(names.as_slice())?;
    let mut out = table.clone();

    for (name, col) in names.into_iter().zip(indices) {
        let values = table
            .rows()
            .iter()
            .map(|row| {
                let v = row.value(col)?;
                Some(match limits.get(name, &row.code) {
                    Some((lo, hi)) => v.max(lo).min(hi),
                    None => v,
                })
            })
            .collect();
        out = out.with_column(name, values)?;
    }

    Ok(out)
}

pub fn winsorize<S: AsRef<str>>(
    table: &ObservationTable,
    factor_columns: &[S],
    bounds: WinsorBounds,
) -> Result<ObservationTable, FactorError> {
    let limits = winsor_limits(table, factor_columns, bounds)?;
    tracing::debug!(
        columns = factor_columns.len(),
        lower = bounds.lower,
        upper = bounds.upper,
        "winsorized factor columns"
    );
    clip_to_limits(table, &limits)
}

/// Adds `<factor>_z` for each factor: (value - group mean) / group sample std.
///
/// A group whose deviation is zero or undefined (fewer than two values)
/// produces missing z-scores.
pub fn zscore<S: AsRef<str>>(
    table: &ObservationTable,
    factor_columns: &[S],
) -> Result<ObservationTable, FactorError> {
    let indices = table.require_columns(factor_columns)?;
    let groups = table.groups();
    let mut out = table.clone();

    for (name, &col) in factor_columns.iter().zip(&indices) {
        let mut z = vec![None; table.len()];
        for (code, rows) in &groups {
            let present: Vec<f64> = rows
                .iter()
                .filter_map(|&i| table.rows()[i].value(col))
                .collect();
            let (Some(m), Some(sd)) = (mean(&present), sample_std(&present)) else {
                tracing::debug!(code, column = name.as_ref(), "too few values to z-score");
                continue;
            };
            if sd == 0.0 {
                tracing::debug!(code, column = name.as_ref(), "zero deviation, z-score undefined");
                continue;
            }
            for &i in rows {
                z[i] = table.rows()[i].value(col).map(|v| (v - m) / sd);
            }
        }
        out = out.with_column(&z_column(name.as_ref()), z)?;
    }

    Ok(out)
}
