use crate::error::{PayrollError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive settlement window in UTC.
///
/// Built from two calendar dates; covers `start 00:00:00.000` through
/// `end 23:59:59.999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl PayWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PayrollError::InvalidRange(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        // 23:59:59.999 always exists
        let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.end.and_time(last_milli).and_utc()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at() <= at && at <= self.ends_at()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| PayrollError::InvalidRange(format!("'{raw}' is not a YYYY-MM-DD date")))
}
