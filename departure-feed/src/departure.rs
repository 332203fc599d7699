//! Departure records as delivered by the feed, and their parsed form.

use crate::error::DepartureError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use std::fmt::{self, Display};

/// The timestamp format used by the feed, e.g. `2024-01-01T08:00:00+01:00`.
///
/// Chrono accepts the offset with or without a colon when parsing `%z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Remark type which flags a departure as deviating from the plan.
const DEVIATION: &str = "DEVIATION";

/// A physical track (platform) identifier.
///
/// The feed is not consistent about whether these are strings or integers,
/// so both are accepted and normalized to text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Track(String);

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Track {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for Track {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTrack {
            Text(String),
            Number(i64),
        }

        Ok(match RawTrack::deserialize(deserializer)? {
            RawTrack::Text(id) => Track(id),
            RawTrack::Number(id) => Track(id.to_string()),
        })
    }
}

/// The parameter of an `update` call.
#[derive(Deserialize, Debug)]
pub struct UpdatePayload {
    pub departures: Vec<DepartureRecord>,
}

/// One departure exactly as the feed sends it.
///
/// Unknown members are ignored; the feed sends a lot more than we display.
#[derive(Deserialize, Debug)]
pub struct DepartureRecord {
    pub track: Track,
    #[serde(default)]
    pub line: Option<String>,
    pub destination: Destination,
    pub scheduled: String,
    pub expected: String,
    #[serde(default)]
    pub remarks: Option<Vec<Remark>>,
}

#[derive(Deserialize, Debug)]
pub struct Destination {
    pub default: String,
}

#[derive(Deserialize, Debug)]
pub struct Remark {
    #[serde(rename = "type")]
    pub kind: String,
}

/// A parsed departure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub track: Track,
    /// Line label (e.g. `L1`); empty if the feed didn't send one.
    pub line: String,
    pub destination: String,
    pub scheduled: DateTime<FixedOffset>,
    pub expected: DateTime<FixedOffset>,
    pub deviation: bool,
}

impl Departure {
    /// Whole minutes between the scheduled and expected times.
    ///
    /// Negative if the feed reports an early departure; callers must not display that.
    pub fn delay_minutes(&self) -> i64 {
        (self.expected - self.scheduled).num_minutes()
    }
}

impl TryFrom<DepartureRecord> for Departure {
    type Error = DepartureError;

    fn try_from(record: DepartureRecord) -> Result<Self, Self::Error> {
        let deviation = record
            .remarks
            .as_deref()
            .is_some_and(|remarks| remarks.iter().any(|remark| remark.kind == DEVIATION));

        Ok(Departure {
            scheduled: parse_timestamp("scheduled", &record.scheduled)?,
            expected: parse_timestamp("expected", &record.expected)?,
            track: record.track,
            line: record.line.unwrap_or_default(),
            destination: record.destination.default,
            deviation,
        })
    }
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<FixedOffset>, DepartureError> {
    DateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| DepartureError::InvalidTimestamp {
        field,
        value: value.to_string(),
        source,
    })
}
