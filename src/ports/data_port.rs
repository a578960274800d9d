//! Price data access port trait.

use crate::domain::bar::PriceBar;
use crate::domain::error::FactorError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` with `start_date <= date <= end_date`, oldest first.
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, FactorError>;

    fn list_codes(&self) -> Result<Vec<String>, FactorError>;
}
