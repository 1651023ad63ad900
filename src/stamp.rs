//! Run timestamp shared by the bundle name, release tag, and artefacts.
//!
//! A run reads the wall clock once, at start-up, and threads the resulting
//! [`RunStamp`] through every stage so that names derived from it agree.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::fmt;

/// `strftime` pattern of the 14-digit compact form.
const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of digits in the compact form.
pub const COMPACT_LEN: usize = 14;

/// The UTC instant a run started, truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunStamp(DateTime<Utc>);

impl RunStamp {
    /// Capture the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap an existing instant, dropping sub-second precision.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let whole = DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant);
        Self(whole)
    }

    /// Parse the 14-digit compact form (`YYYYMMDDHHMMSS`).
    ///
    /// # Examples
    ///
    /// ```
    /// use release_gate::stamp::RunStamp;
    ///
    /// let stamp = RunStamp::parse_compact("20261018093000").expect("valid stamp");
    /// assert_eq!(stamp.compact(), "20261018093000");
    /// assert!(RunStamp::parse_compact("20261332093000").is_none());
    /// ```
    #[must_use]
    pub fn parse_compact(digits: &str) -> Option<Self> {
        if digits.len() != COMPACT_LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(digits, COMPACT_FORMAT)
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }

    /// The 14-digit compact form used in tags and bundle names.
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.format(COMPACT_FORMAT).to_string()
    }

    /// RFC 3339 form used in reports and artefact metadata.
    #[must_use]
    pub fn rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// The underlying instant.
    #[must_use]
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rfc3339())
    }
}
