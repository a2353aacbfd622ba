use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical calendar-date key. Every date-scoped entity is partitioned by
/// this value; the wire form is always `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| format!("'{value}' must be YYYY-MM-DD"))
    }

    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Monday of the week this date falls in. Weekly plans are keyed by it.
    pub fn week_start(&self) -> DateKey {
        let offset = self.0.weekday().num_days_from_monday();
        Self(self.0 - Duration::days(i64::from(offset)))
    }

    pub fn is_week_start(&self) -> bool {
        self.0.weekday().num_days_from_monday() == 0
    }

    pub fn previous_day(&self) -> DateKey {
        Self(self.0 - Duration::days(1))
    }

    pub fn next_day(&self) -> DateKey {
        Self(self.0 + Duration::days(1))
    }

    pub fn previous_week(&self) -> DateKey {
        Self(self.0 - Duration::days(7))
    }

    pub fn next_week(&self) -> DateKey {
        Self(self.0 + Duration::days(7))
    }

    pub fn days_until(&self, other: DateKey) -> i64 {
        (other.0 - self.0).num_days()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for DateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
