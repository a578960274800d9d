//! Factor cache port trait.

use crate::domain::error::FactorError;
use chrono::NaiveDate;

/// One cached factor: (code, datetime, value) entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorColumn {
    pub entries: Vec<(String, NaiveDate, Option<f64>)>,
}

impl FactorColumn {
    pub fn iter(&self) -> impl Iterator<Item = (&str, NaiveDate, Option<f64>)> {
        self.entries.iter().map(|(c, d, v)| (c.as_str(), *d, *v))
    }
}

/// Factor values keyed by factor name and the requested date range.
pub trait FactorCachePort {
    fn load(
        &self,
        factor: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<FactorColumn>, FactorError>;

    fn save(
        &self,
        factor: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        column: &FactorColumn,
    ) -> Result<(), FactorError>;
}
