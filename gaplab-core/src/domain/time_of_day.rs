//! Serde helpers for local time-of-day fields.
//!
//! Persisted trade files carry times as `"HH:MM"` or `"HH:MM:SS"` strings;
//! both are accepted. Output is always `"HH:MM:SS"`.

use chrono::NaiveTime;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Parses `HH:MM:SS` or `HH:MM`.
pub fn parse(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

pub fn format(t: &NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(t))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse(&s).ok_or_else(|| D::Error::custom(format!("invalid time of day '{s}'")))
}

/// Optional variant: null, missing or empty strings map to `None`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        t: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => serializer.serialize_some(&super::format(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time of day '{s}'"))),
        }
    }
}
