//! Technical factors computed per instrument from closes.
//!
//! Factor columns are named `<FACTOR>_<window>`, e.g. `SMA_5` or `MOM_20`.

pub mod momentum;
pub mod sma;

use crate::domain::error::FactorError;
use crate::domain::table::{ObservationTable, CLOSE};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorKind {
    Sma,
    Mom,
}

impl FactorKind {
    fn prefix(self) -> &'static str {
        match self {
            FactorKind::Sma => "SMA",
            FactorKind::Mom => "MOM",
        }
    }
}

/// A factor identity plus its window; doubles as the column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactorSpec {
    pub kind: FactorKind,
    pub window: usize,
}

impl FactorSpec {
    pub fn column_name(&self) -> String {
        self.to_string()
    }

    /// Raw factor values aligned with the closes of one instrument.
    pub fn calculate(&self, closes: &[Option<f64>]) -> Vec<Option<f64>> {
        match self.kind {
            FactorKind::Sma => sma::calculate_sma(closes, self.window),
            FactorKind::Mom => momentum::calculate_momentum(closes, self.window),
        }
    }
}

impl fmt::Display for FactorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.window)
    }
}

impl FromStr for FactorSpec {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || FactorError::UnknownFactor(s.to_string());
        let (prefix, window) = s.trim().rsplit_once('_').ok_or_else(unknown)?;
        let kind = match prefix.to_ascii_uppercase().as_str() {
            "SMA" => FactorKind::Sma,
            "MOM" => FactorKind::Mom,
            _ => return Err(unknown()),
        };
        let window: usize = window.parse().map_err(|_| unknown())?;
        if window == 0 {
            return Err(unknown());
        }
        Ok(FactorSpec { kind, window })
    }
}

/// Parses a comma-separated factor list such as `SMA_5, MOM_5`.
pub fn parse_factor_list(input: &str) -> Result<Vec<FactorSpec>, FactorError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Adds the factor column, computed per code in datetime order. Row order of
/// the returned table matches the input.
pub fn compute_factor(
    table: &ObservationTable,
    spec: &FactorSpec,
) -> Result<ObservationTable, FactorError> {
    let close_col = table.column_index(CLOSE)?;
    let mut values = vec![None; table.len()];

    for (code, rows) in table.groups() {
        let closes: Vec<Option<f64>> = rows.iter().map(|&i| table.rows()[i].value(close_col)).collect();
        let computed = spec.calculate(&closes);
        for (&i, v) in rows.iter().zip(computed) {
            values[i] = v;
        }
        tracing::debug!(code, factor = %spec, rows = rows.len(), "computed factor");
    }

    table.with_column(&spec.column_name(), values)
}

pub fn compute_factors(
    table: &ObservationTable,
    specs: &[FactorSpec],
) -> Result<ObservationTable, FactorError> {
    specs
        .iter()
        .try_fold(table.clone(), |acc, spec| compute_factor(&acc, spec))
}
