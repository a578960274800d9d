//! Observation table keyed by (code, datetime).
//!
//! Every pipeline stage takes a table by reference and returns a new one, so
//! earlier stages stay inspectable after later stages run. Numeric columns are
//! addressed by name; a missing cell is `None`.

use crate::domain::bar::PriceBar;
use crate::domain::error::FactorError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const CODE: &str = "code";
pub const DATETIME: &str = "datetime";
pub const CLOSE: &str = "close";
pub const SIGNAL: &str = "signal";
pub const POSITION: &str = "position";
pub const RETURN: &str = "return";
pub const STRATEGY_RETURN: &str = "strategy_return";

/// Suffix appended to a factor column by z-scoring.
pub const Z_SUFFIX: &str = "_z";

pub fn z_column(factor: &str) -> String {
    format!("{factor}{Z_SUFFIX}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub code: String,
    pub datetime: NaiveDate,
    values: Vec<Option<f64>>,
}

impl Observation {
    pub fn new(code: impl Into<String>, datetime: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self {
            code: code.into(),
            datetime,
            values,
        }
    }

    pub fn value(&self, col: usize) -> Option<f64> {
        self.values.get(col).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    columns: Vec<String>,
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// Builds a table, rejecting ragged rows and repeated (code, datetime) keys.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Observation>) -> Result<Self, FactorError> {
        {
            let mut seen = HashSet::with_capacity(rows.len());
            for row in &rows {
                if row.values.len() != columns.len() {
                    return Err(FactorError::Data {
                        reason: format!(
                            "row {} {} has {} values, table has {} columns",
                            row.code,
                            row.datetime,
                            row.values.len(),
                            columns.len()
                        ),
                    });
                }
                if !seen.insert((row.code.as_str(), row.datetime)) {
                    return Err(FactorError::DuplicateKey {
                        code: row.code.clone(),
                        datetime: row.datetime,
                    });
                }
            }
        }
        Ok(Self { columns, rows })
    }

    /// One row per bar with a single `close` column.
    pub fn from_bars(bars: &[PriceBar]) -> Result<Self, FactorError> {
        let rows = bars
            .iter()
            .map(|bar| Observation::new(bar.code.clone(), bar.date, vec![Some(bar.close)]))
            .collect();
        Self::from_rows(vec![CLOSE.to_string()], rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, FactorError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FactorError::schema([name]))
    }

    /// Resolves every name, reporting all absent ones in a single error.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, FactorError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.columns.iter().position(|c| c == name.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(FactorError::Schema { missing })
        }
    }

    pub fn column(&self, name: &str) -> Result<Vec<Option<f64>>, FactorError> {
        let col = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r.value(col)).collect())
    }

    /// Returns a copy with `name` set to `values`, replacing an existing column
    /// of the same name or appending a new one.
    pub fn with_column(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self, FactorError> {
        if values.len() != self.rows.len() {
            return Err(FactorError::Data {
                reason: format!(
                    "column {} has {} values, table has {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            });
        }

        let mut table = self.clone();
        match self.columns.iter().position(|c| c == name) {
            Some(col) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row.values[col] = value;
                }
            }
            None => {
                table.columns.push(name.to_string());
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row.values.push(value);
                }
            }
        }
        Ok(table)
    }

    /// Left-joins a keyed column onto the table; rows without a match get `None`.
    pub fn join_column<'a, I>(&self, name: &str, entries: I) -> Result<Self, FactorError>
    where
        I: IntoIterator<Item = (&'a str, NaiveDate, Option<f64>)>,
    {
        let lookup: HashMap<(&str, NaiveDate), Option<f64>> = entries
            .into_iter()
            .map(|(code, date, value)| ((code, date), value))
            .collect();
        let values = self
            .rows
            .iter()
            .map(|r| {
                lookup
                    .get(&(r.code.as_str(), r.datetime))
                    .copied()
                    .flatten()
            })
            .collect();
        self.with_column(name, values)
    }

    /// Copy sorted ascending by (code, datetime).
    pub fn sorted(&self) -> Self {
        let mut table = self.clone();
        table
            .rows
            .sort_by(|a, b| a.code.cmp(&b.code).then(a.datetime.cmp(&b.datetime)));
        table
    }

    /// Row indices per code, each list in ascending datetime order. The table
    /// itself is not reordered, so callers can write results back by index.
    pub fn groups(&self) -> Vec<(&str, Vec<usize>)> {
        let mut by_code: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            by_code.entry(row.code.as_str()).or_default().push(i);
        }
        by_code
            .into_iter()
            .map(|(code, mut idx)| {
                idx.sort_by_key(|&i| self.rows[i].datetime);
                (code, idx)
            })
            .collect()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.groups().into_iter().map(|(code, _)| code).collect()
    }
}
