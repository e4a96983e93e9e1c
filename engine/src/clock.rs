//! Watermark timestamps.
//!
//! The cache never does clock arithmetic on remote timestamps. Every
//! timestamp that crosses the remote boundary is canonicalised into a
//! [`Watermark`]: an RFC3339 UTC string with microsecond precision. In that
//! form lexicographic order and chronological order coincide, so the engine
//! compares watermarks as strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical ISO-8601 UTC timestamp used for modification watermarks.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(String);

impl Watermark {
    /// Canonicalise a UTC instant.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Parse any RFC3339 string and canonicalise it.
    ///
    /// Strings that are not RFC3339 are kept verbatim; they still compare as
    /// strings, they just lose the chronological guarantee.
    pub fn parse(raw: &str) -> Self {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => Self::from_datetime(at.with_timezone(&Utc)),
            Err(_) => Self(raw.to_string()),
        }
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a UTC instant.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Calendar date (UTC) of this timestamp.
    pub fn date(&self) -> Option<NaiveDate> {
        self.to_datetime().map(|at| at.date_naive())
    }

    /// Return the later of two optional watermarks.
    pub fn latest(current: Option<Watermark>, candidate: Option<Watermark>) -> Option<Watermark> {
        match (current, candidate) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}
