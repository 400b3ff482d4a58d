use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use crate::core::error::{Result, StoreError};

/// Server timestamp scalar.
///
/// Accepts RFC3339 strings and the relative shortcuts `now` and
/// `-<n><unit>` / `+<n><unit>` with units s, m, h, d, w. Relative forms are
/// resolved against the wall clock at parse time; absolute forms keep their
/// offset so serialization round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().fixed_offset())
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("now") {
            return Ok(Self::now());
        }
        if let Some(offset) = parse_relative(trimmed) {
            return Ok(Self((Utc::now() + offset).fixed_offset()));
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(Self)
            .map_err(|e| StoreError::Payload(format!("invalid timestamp '{}': {}", input, e)))
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    pub fn inner(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.fixed_offset())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_relative(input: &str) -> Option<Duration> {
    let (sign, rest) = match input.as_bytes().first()? {
        b'-' => (-1i64, &input[1..]),
        b'+' => (1i64, &input[1..]),
        _ => return None,
    };
    if rest.len() < 2 {
        return None;
    }
    let (digits, unit) = rest.split_at(rest.len() - 1);
    let n: i64 = digits.parse().ok()?;
    let magnitude = match unit {
        "s" => Duration::seconds(n),
        "m" => Duration::minutes(n),
        "h" => Duration::hours(n),
        "d" => Duration::days(n),
        "w" => Duration::weeks(n),
        _ => return None,
    };
    Some(magnitude * sign as i32)
}

/// Date scalar with three accepted precisions: `YYYY`, `YYYY-MM`, and
/// `YYYY-MM-DD`. Precision round-trips losslessly through parse/serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FuzzyDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl FuzzyDate {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn year_month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(StoreError::Payload(format!("invalid month {}", month)));
        }
        Ok(Self {
            year,
            month: Some(month),
            day: None,
        })
    }

    pub fn full(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| StoreError::Payload(format!("invalid date {}-{}-{}", year, month, day)))?;
        Ok(Self {
            year,
            month: Some(month),
            day: Some(day),
        })
    }

    pub fn parse(input: &str) -> Result<Self> {
        let bad = || StoreError::Payload(format!("invalid fuzzy date '{}'", input));
        let parts: Vec<&str> = input.split('-').collect();
        match parts.as_slice() {
            [y] => {
                let year = parse_year(y).ok_or_else(bad)?;
                Ok(Self::year(year))
            }
            [y, m] => {
                let year = parse_year(y).ok_or_else(bad)?;
                let month = parse_two_digits(m).ok_or_else(bad)?;
                Self::year_month(year, month)
            }
            [y, m, d] => {
                let year = parse_year(y).ok_or_else(bad)?;
                let month = parse_two_digits(m).ok_or_else(bad)?;
                let day = parse_two_digits(d).ok_or_else(bad)?;
                Self::full(year, month, day)
            }
            _ => Err(bad()),
        }
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for FuzzyDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
            (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for FuzzyDate {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
