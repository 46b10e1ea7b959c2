use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::CalcError;

/// Fixed-format fallback used by older records.
pub const FALLBACK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const AWARE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A stored instant that may or may not carry a timezone.
///
/// Ordering and equality coerce a naive value to UTC first, so mixed
/// comparisons never fail.
#[derive(Debug, Clone, Copy)]
pub enum Moment {
    Aware(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl Moment {
    /// ISO-8601 first (with or without `Z`/offset), then [`FALLBACK_FORMAT`].
    pub fn parse(raw: &str) -> Result<Self, CalcError> {
        let s = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Moment::Aware(dt.with_timezone(&Utc)));
        }
        for fmt in AWARE_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(Moment::Aware(dt.with_timezone(&Utc)));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Moment::Naive(naive));
            }
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, FALLBACK_FORMAT) {
            return Ok(Moment::Naive(naive));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Moment::Naive(midnight));
        }

        Err(CalcError::Timestamp {
            input: raw.to_string(),
        })
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, Moment::Naive(_))
    }

    /// Naive values are read as UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Moment::Aware(dt) => *dt,
            Moment::Naive(naive) => Utc.from_utc_datetime(naive),
        }
    }

    pub fn is_after(&self, other: &Moment) -> bool {
        self.to_utc() > other.to_utc()
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(dt: DateTime<Utc>) -> Self {
        Moment::Aware(dt)
    }
}

impl From<NaiveDateTime> for Moment {
    fn from(naive: NaiveDateTime) -> Self {
        Moment::Naive(naive)
    }
}

impl FromStr for Moment {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Moment::parse(s)
    }
}

impl PartialEq for Moment {
    fn eq(&self, other: &Self) -> bool {
        self.to_utc() == other.to_utc()
    }
}

impl Eq for Moment {}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Moment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc().cmp(&other.to_utc())
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Moment::Aware(dt) => write!(f, "{}", to_wire(dt)),
            Moment::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// Canonical stored form: RFC 3339, microsecond precision, `Z` suffix.
/// Fixed width, so stored values also sort correctly as text.
pub fn to_wire(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde adapter for `DateTime<Utc>` fields that tolerates every stored
/// timestamp shape [`Moment::parse`] accepts.
pub mod flexible {
    use super::{to_wire, Moment};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_wire(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Moment::parse(&raw)
            .map(|m| m.to_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Same as [`flexible`] for nullable fields.
pub mod flexible_option {
    use super::{to_wire, Moment};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_some(&to_wire(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => Moment::parse(&raw)
                .map(|m| Some(m.to_utc()))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
