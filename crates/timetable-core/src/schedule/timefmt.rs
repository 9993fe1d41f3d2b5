//! Timestamp parsing and formatting shared by requests, output and storage.
//!
//! All timestamps are naive local wall-clock times. RFC 3339 input is
//! accepted and converted to its UTC wall time.

use chrono::{DateTime, NaiveDateTime, Timelike};

use crate::error::InputError;

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a timestamp in any accepted format.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, InputError> {
    let raw = raw.trim();
    for fmt in ACCEPTED_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .map_err(|_| InputError::BadTimestamp(raw.to_string()))
}

/// Format as `YYYY-MM-DD HH:MM`, adding seconds only when they are non-zero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.second() == 0 {
        ts.format("%Y-%m-%d %H:%M").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// `#[serde(with = "timefmt::serde_ts")]` for `NaiveDateTime` fields.
pub mod serde_ts {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "timefmt::serde_ts_opt")]` for `Option<NaiveDateTime>` fields.
pub mod serde_ts_opt {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&super::format_timestamp(ts)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parses_space_and_iso_forms() {
        assert_eq!(parse_timestamp("2025-10-20 12:00").unwrap(), at(12, 0));
        assert_eq!(parse_timestamp("2025-10-20T12:00").unwrap(), at(12, 0));
        assert_eq!(parse_timestamp("2025-10-20T12:00:00").unwrap(), at(12, 0));
        assert_eq!(parse_timestamp(" 2025-10-20 14:30 ").unwrap(), at(14, 30));
    }

    #[test]
    fn rfc3339_is_converted_to_utc_wall_time() {
        assert_eq!(parse_timestamp("2025-10-20T12:00:00Z").unwrap(), at(12, 0));
        assert_eq!(parse_timestamp("2025-10-20T14:00:00+02:00").unwrap(), at(12, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parse_timestamp("next tuesday"),
            Err(InputError::BadTimestamp("next tuesday".to_string()))
        );
    }

    #[test]
    fn formats_without_seconds_when_zero() {
        assert_eq!(format_timestamp(&at(9, 5)), "2025-10-20 09:05");
        let with_secs = at(9, 5) + chrono::Duration::seconds(7);
        assert_eq!(format_timestamp(&with_secs), "2025-10-20 09:05:07");
    }
}
