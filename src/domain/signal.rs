//! Row-wise signal generation from normalized factor columns.

use crate::domain::error::FactorError;
use crate::domain::table::{ObservationTable, SIGNAL};
use std::fmt;
use std::str::FromStr;

/// Discrete trading decision for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Short,
    Flat,
    Long,
}

impl Signal {
    pub fn as_f64(self) -> f64 {
        match self {
            Signal::Short => -1.0,
            Signal::Flat => 0.0,
            Signal::Long => 1.0,
        }
    }

    /// Reads a stored signal cell; only -1, 0 and 1 are signals.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(Signal::Long)
        } else if value == -1.0 {
            Some(Signal::Short)
        } else if value == 0.0 {
            Some(Signal::Flat)
        } else {
            None
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Short => write!(f, "-1"),
            Signal::Flat => write!(f, "0"),
            Signal::Long => write!(f, "1"),
        }
    }
}

/// Named rule combining several factor values into one [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalRule {
    /// Long when every value is > 0, short when every value is < 0, else flat.
    #[default]
    AllPositive,
}

impl SignalRule {
    /// Applies the rule to one row. A missing value, or an empty row, is flat.
    pub fn evaluate(self, values: &[Option<f64>]) -> Signal {
        match self {
            SignalRule::AllPositive => {
                if values.is_empty() || values.iter().any(Option::is_none) {
                    return Signal::Flat;
                }
                if values.iter().all(|v| v.is_some_and(|x| x > 0.0)) {
                    Signal::Long
                } else if values.iter().all(|v| v.is_some_and(|x| x < 0.0)) {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            }
        }
    }
}

impl FromStr for SignalRule {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_positive" => Ok(SignalRule::AllPositive),
            _ => Err(FactorError::UnsupportedRule(s.to_string())),
        }
    }
}

impl fmt::Display for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalRule::AllPositive => write!(f, "all_positive"),
        }
    }
}

/// Returns a copy of `table` with a `signal` column, each row evaluated on
/// its own `columns` values.
pub fn generate_signals<S: AsRef<str>>(
    table: &ObservationTable,
    columns: &[S],
    rule: SignalRule,
) -> Result<ObservationTable, FactorError> {
    let indices = table.require_columns(columns)?;

    let mut row_values = Vec::with_capacity(indices.len());
    let signals: Vec<Option<f64>> = table
        .rows()
        .iter()
        .map(|row| {
            row_values.clear();
            row_values.extend(indices.iter().map(|&col| row.value(col)));
            Some(rule.evaluate(&row_values).as_f64())
        })
        .collect();

    let active = signals.iter().filter(|s| **s != Some(0.0)).count();
    tracing::debug!(%rule, rows = table.len(), active, "generated signals");

    table.with_column(SIGNAL, signals)
}

/// Like [`generate_signals`], with the rule given by name.
pub fn generate_signals_named<S: AsRef<str>>(
    table: &ObservationTable,
    columns: &[S],
    rule: &str,
) -> Result<ObservationTable, FactorError> {
    generate_signals(table, columns, rule.parse()?)
}
