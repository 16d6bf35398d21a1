//! Calendar month arithmetic.
//!
//! A month is normalised to the integer `year * 12 + month` (month in 1..=12),
//! so offsets and distances are plain integer arithmetic. The textual form is
//! `YYYY-MM`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar month, stored as `year * 12 + month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(i64);

/// Error returned when a string is not a valid `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month '{0}': expected YYYY-MM")]
pub struct MonthParseError(pub String);

impl Month {
    /// Build a month from a year and a 1-based month number.
    /// Returns `None` when `month` is outside 1..=12.
    pub fn new(year: i64, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(year * 12 + i64::from(month)))
    }

    /// Build a month from its normalised integer form. Every integer is valid.
    pub fn from_index(index: i64) -> Self {
        Self(index)
    }

    /// The normalised integer form `year * 12 + month`.
    pub fn index(self) -> i64 {
        self.0
    }

    pub fn year(self) -> i64 {
        (self.0 - 1).div_euclid(12)
    }

    /// 1-based month of the year.
    pub fn month(self) -> u32 {
        ((self.0 - 1).rem_euclid(12) + 1) as u32
    }

    /// Shift by a signed number of months.
    pub fn offset(self, months: i64) -> Self {
        Self(self.0 + months)
    }

    /// Signed distance `other - self` in months.
    pub fn months_until(self, other: Month) -> i64 {
        other.0 - self.0
    }

    /// Contiguous months from `start` to `end`, both inclusive.
    /// Empty when `end < start`.
    pub fn sequence(start: Month, end: Month) -> Vec<Month> {
        (start.0..=end.0).map(Month).collect()
    }

    /// Quarter label of the enclosing quarter, e.g. `2024Q2`.
    pub fn quarter_label(self) -> String {
        format!("{:04}Q{}", self.year(), (self.month() - 1) / 3 + 1)
    }

    /// Year label of the enclosing year, e.g. `2024`.
    pub fn year_label(self) -> String {
        format!("{:04}", self.year())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthParseError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let year: i64 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Month::new(year, month).ok_or_else(err)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
