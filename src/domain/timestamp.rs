//! ISO-8601 timestamp encoding for object files
//!
//! Timestamps are written with microsecond precision and an explicit
//! `+00:00` offset, e.g. `2024-03-01T09:30:00.123456+00:00`. Any RFC 3339
//! timestamp is accepted when reading.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Number of fractional second digits kept in object files
const SUBSEC_DIGITS: u16 = 6;

/// Formats a timestamp the way it is stored on disk
pub fn format(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parses a stored timestamp, normalizing it to UTC
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Truncates a timestamp to the precision kept on disk
pub fn truncate(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(SUBSEC_DIGITS)
}

/// Current UTC time at on-disk precision
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(timestamp))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse(&value).map_err(serde::de::Error::custom)
}

/// Same encoding for optional timestamps
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timestamp {
            Some(timestamp) => serializer.serialize_str(&super::format(timestamp)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|v| super::parse(&v).map_err(serde::de::Error::custom))
            .transpose()
    }
}
