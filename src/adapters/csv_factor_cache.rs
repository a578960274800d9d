//! CSV-backed factor cache.
//!
//! One file per factor and date range: `<dir>/<FACTOR>_<start>_<end>.csv`
//! with header `code,datetime,<FACTOR>`. An empty value cell is a missing value.

use crate::adapters::csv_adapter::parse_date;
use crate::domain::error::FactorError;
use crate::domain::table::{CODE, DATETIME};
use crate::ports::factor_cache_port::{FactorCachePort, FactorColumn};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvFactorCache {
    dir: PathBuf,
}

impl CsvFactorCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn cache_path(&self, factor: &str, start_date: NaiveDate, end_date: NaiveDate) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.csv",
            factor,
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d")
        ))
    }
}

fn csv_error(path: &std::path::Path, e: csv::Error) -> FactorError {
    FactorError::Data {
        reason: format!("factor cache {}: {}", path.display(), e),
    }
}

impl FactorCachePort for CsvFactorCache {
    fn load(
        &self,
        factor: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<FactorColumn>, FactorError> {
        let path = self.cache_path(factor, start_date, end_date);
        if !path.exists() {
            tracing::debug!(factor, path = %path.display(), "factor cache miss");
            return Ok(None);
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        let headers = rdr.headers().map_err(|e| csv_error(&path, e))?.clone();
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let (code_col, date_col, value_col) = match (find(CODE), find(DATETIME), find(factor)) {
            (Some(c), Some(d), Some(v)) => (c, d, v),
            (c, d, v) => {
                let missing = [(c, CODE), (d, DATETIME), (v, factor)]
                    .into_iter()
                    .filter(|(idx, _)| idx.is_none())
                    .map(|(_, name)| name);
                return Err(FactorError::schema(missing));
            }
        };

        let mut entries = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| csv_error(&path, e))?;
            let code = record.get(code_col).unwrap_or("").trim().to_string();
            let date = parse_date(record.get(date_col).unwrap_or(""))?;
            let raw = record.get(value_col).unwrap_or("").trim();
            let value = if raw.is_empty() {
                None
            } else {
                Some(raw.parse::<f64>().map_err(|e| FactorError::Data {
                    reason: format!("factor cache {}: invalid value {:?}: {}", path.display(), raw, e),
                })?)
            };
            entries.push((code, date, value));
        }

        tracing::debug!(factor, rows = entries.len(), "factor cache hit");
        Ok(Some(FactorColumn { entries }))
    }

    fn save(
        &self,
        factor: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        column: &FactorColumn,
    ) -> Result<(), FactorError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.cache_path(factor, start_date, end_date);

        let mut wtr = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        wtr.write_record([CODE, DATETIME, factor])
            .map_err(|e| csv_error(&path, e))?;
        for (code, date, value) in column.iter() {
            let date = date.to_string();
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            wtr.write_record([code, date.as_str(), value.as_str()])
                .map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;

        tracing::debug!(factor, rows = column.entries.len(), path = %path.display(), "saved factor cache");
        Ok(())
    }
}
