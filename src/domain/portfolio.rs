//! Portfolio return aggregation across instruments.

use crate::domain::error::FactorError;
use crate::domain::table::{ObservationTable, POSITION, RETURN, STRATEGY_RETURN};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How per-instrument strategy returns on one date combine into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Arithmetic mean over the instruments with a return on that date.
    #[default]
    EqualWeight,
}

impl FromStr for Aggregation {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal_weight" => Ok(Aggregation::EqualWeight),
            _ => Err(FactorError::UnsupportedAggregation(s.to_string())),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::EqualWeight => write!(f, "equal_weight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnPoint {
    pub datetime: NaiveDate,
    pub portfolio_return: Option<f64>,
}

/// `portfolio_return` series, one point per distinct date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioReturns {
    points: Vec<ReturnPoint>,
}

impl PortfolioReturns {
    /// Orders points by date. Later points win over earlier ones on the same date.
    pub fn new(points: Vec<ReturnPoint>) -> Self {
        let by_date: BTreeMap<NaiveDate, Option<f64>> = points
            .into_iter()
            .map(|p| (p.datetime, p.portfolio_return))
            .collect();
        Self {
            points: by_date
                .into_iter()
                .map(|(datetime, portfolio_return)| ReturnPoint {
                    datetime,
                    portfolio_return,
                })
                .collect(),
        }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Non-missing returns in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.portfolio_return).collect()
    }
}

/// Adds `strategy_return = position * return`; missing when either is missing.
pub fn add_strategy_returns(table: &ObservationTable) -> Result<ObservationTable, FactorError> {
    let cols = table.require_columns(&[POSITION, RETURN])?;
    let (pos_col, ret_col) = (cols[0], cols[1]);
    let values = table
        .rows()
        .iter()
        .map(|row| Some(row.value(pos_col)? * row.value(ret_col)?))
        .collect();
    table.with_column(STRATEGY_RETURN, values)
}

/// Groups `strategy_return` by date.
///
/// Missing instrument returns are left out of that date's mean; a date with
/// no available return at all keeps a missing portfolio return.
pub fn aggregate_returns(
    table: &ObservationTable,
    method: Aggregation,
) -> Result<PortfolioReturns, FactorError> {
    let col = table.column_index(STRATEGY_RETURN)?;

    match method {
        Aggregation::EqualWeight => {
            let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
            for row in table.rows() {
                let entry = by_date.entry(row.datetime).or_insert((0.0, 0));
                if let Some(r) = row.value(col) {
                    entry.0 += r;
                    entry.1 += 1;
                }
            }
            let points: Vec<ReturnPoint> = by_date
                .into_iter()
                .map(|(datetime, (sum, count))| ReturnPoint {
                    datetime,
                    portfolio_return: (count > 0).then(|| sum / count as f64),
                })
                .collect();
            tracing::debug!(%method, dates = points.len(), "aggregated portfolio returns");
            Ok(PortfolioReturns { points })
        }
    }
}

/// Strategy returns plus aggregation: the table gains `strategy_return` and
/// the date-level series is returned alongside it.
pub fn calculate_strategy_return(
    table: &ObservationTable,
    method: Aggregation,
) -> Result<(ObservationTable, PortfolioReturns), FactorError> {
    let with_returns = add_strategy_returns(table)?;
    let portfolio = aggregate_returns(&with_returns, method)?;
    Ok((with_returns, portfolio))
}
