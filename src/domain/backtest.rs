//! Backtest preparation: ordering, per-instrument returns and T+1 positions.
//!
//! A signal observed on day t is only acted on at day t+1, so the position
//! held over row t is the signal of row t-1 within the same code.

use crate::domain::error::FactorError;
use crate::domain::table::{ObservationTable, CLOSE, POSITION, RETURN, SIGNAL};

/// Simple return between two closes; missing when either close is missing or
/// the base is zero.
fn simple_return(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    match (prev, curr) {
        (Some(p), Some(c)) if p != 0.0 => Some(c / p - 1.0),
        _ => None,
    }
}

/// Sorts by (code, datetime) and adds `return` and `position`.
///
/// The input is re-sorted here regardless of how it arrives. The first row of
/// each code has a missing return and a zero position; a missing signal on
/// the previous row also lags into a zero position.
pub fn prepare_backtest(table: &ObservationTable) -> Result<ObservationTable, FactorError> {
    let cols = table.require_columns(&[CLOSE, SIGNAL])?;
    let (close_col, signal_col) = (cols[0], cols[1]);

    let sorted = table.sorted();
    let rows = sorted.rows();
    let mut returns = Vec::with_capacity(rows.len());
    let mut positions = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let prev = match i.checked_sub(1).map(|j| &rows[j]) {
            Some(p) if p.code == row.code => Some(p),
            _ => None,
        };
        match prev {
            Some(p) => {
                returns.push(simple_return(p.value(close_col), row.value(close_col)));
                positions.push(Some(p.value(signal_col).unwrap_or(0.0)));
            }
            None => {
                returns.push(None);
                positions.push(Some(0.0));
            }
        }
    }

    tracing::debug!(
        rows = rows.len(),
        codes = sorted.codes().len(),
        "prepared backtest table"
    );

    sorted
        .with_column(RETURN, returns)?
        .with_column(POSITION, positions)
}
