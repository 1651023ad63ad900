//! Timestamp-derived release tags.
//!
//! A tag is a free-form prefix followed by a separator (`-`, `_` or `.`)
//! and the run's UTC start time as fourteen digits, e.g.
//! `compliance-20261018093000`. The timestamp is always read back from the
//! trailing fourteen characters; nothing else about the name is parsed.

use crate::stamp::{COMPACT_LEN, RunStamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATORS: [char; 3] = ['-', '_', '.'];

/// Errors arising from tag construction or parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The name does not end in a separator plus fourteen timestamp digits.
    #[error("tag '{tag}' has no trailing YYYYMMDDHHMMSS timestamp after '-', '_' or '.'")]
    MissingTimestamp {
        /// The offending tag name.
        tag: String,
    },
}

/// A release tag whose name carries its creation time.
///
/// # Examples
///
/// ```
/// use release_gate::release::tag::ReleaseTag;
///
/// let tag = ReleaseTag::parse("compliance-20261018093000").expect("valid tag");
/// assert_eq!(tag.timestamp().to_rfc3339(), "2026-10-18T09:30:00+00:00");
/// assert!(ReleaseTag::parse("compliance-latest").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseTag {
    name: String,
    stamp: RunStamp,
}

impl ReleaseTag {
    /// Build `prefix + YYYYMMDDHHMMSS`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::MissingTimestamp`] when `prefix` does not end in
    /// a separator, since the result would not parse back.
    pub fn generate(prefix: &str, stamp: &RunStamp) -> Result<Self, TagError> {
        Self::parse(&format!("{prefix}{}", stamp.compact()))
    }

    /// Parse a tag name, extracting its timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::MissingTimestamp`] when the last fourteen
    /// characters are not a valid UTC timestamp preceded by a separator.
    pub fn parse(name: &str) -> Result<Self, TagError> {
        let missing = || TagError::MissingTimestamp {
            tag: name.to_owned(),
        };
        let split = name.len().checked_sub(COMPACT_LEN).ok_or_else(missing)?;
        let head = name.get(..split).ok_or_else(missing)?;
        let digits = name.get(split..).ok_or_else(missing)?;
        if !head.ends_with(SEPARATORS) {
            return Err(missing());
        }
        let stamp = RunStamp::parse_compact(digits).ok_or_else(missing)?;
        Ok(Self {
            name: name.to_owned(),
            stamp,
        })
    }

    /// The full tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The embedded UTC timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.stamp.datetime()
    }
}

impl TryFrom<String> for ReleaseTag {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReleaseTag> for String {
    fn from(tag: ReleaseTag) -> Self {
        tag.name
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stamp() -> RunStamp {
        RunStamp::parse_compact("20260102030405").expect("valid stamp")
    }

    #[rstest]
    #[case::dash("compliance-")]
    #[case::underscore("compliance_")]
    #[case::dot("v1.")]
    fn generated_tags_parse_back(#[case] prefix: &str) {
        let tag = ReleaseTag::generate(prefix, &stamp()).expect("valid prefix");
        assert_eq!(tag.name(), format!("{prefix}20260102030405"));
        assert_eq!(tag.timestamp(), stamp().datetime());
        assert_eq!(ReleaseTag::parse(tag.name()), Ok(tag));
    }

    #[rstest]
    #[case::no_separator("compliance20260102030405")]
    #[case::too_short("c-2026010203040")]
    #[case::letters("compliance-2026010203040x")]
    #[case::impossible_date("compliance-20261340030405")]
    #[case::empty("")]
    #[case::digits_only("20260102030405")]
    #[case::trailing_text("compliance-20260102030405-rc")]
    fn malformed_tags_are_rejected(#[case] name: &str) {
        assert_eq!(
            ReleaseTag::parse(name),
            Err(TagError::MissingTimestamp {
                tag: name.to_owned()
            })
        );
    }

    #[test]
    fn prefix_without_separator_cannot_generate() {
        assert!(ReleaseTag::generate("compliance", &stamp()).is_err());
    }

    #[test]
    fn multibyte_names_do_not_panic() {
        assert!(ReleaseTag::parse("réléase-é0260102030405").is_err());
    }
}
