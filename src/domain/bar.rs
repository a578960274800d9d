//! Daily price bar representation.
//!
//! Only the close feeds factors and returns, so a bar is the close on a date.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub code: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn from_close(code: &str, date: NaiveDate, close: f64) -> Self {
        Self {
            code: code.to_string(),
            date,
            close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_close_keeps_code_date_and_close() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let bar = PriceBar::from_close("AAPL", date, 185.5);
        assert_eq!(bar.code, "AAPL");
        assert_eq!(bar.date, date);
        assert_eq!(bar.close, 185.5);
    }
}
