//! Timestamp and calendar utilities

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current calendar year (UTC)
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// First day of a calendar month
pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidInput(format!("Invalid month {}-{:02}", year, month)))
}

/// Last day of a calendar month
pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    first_day_of_month(next_year, next_month)?
        .pred_opt()
        .ok_or_else(|| Error::InvalidInput(format!("Invalid month {}-{:02}", year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_last_day_of_february_leap_year() {
        let d = last_day_of_month(2024, 2).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_last_day_of_december_rolls_year() {
        let d = last_day_of_month(2025, 12).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(first_day_of_month(2025, 13).is_err());
    }
}
