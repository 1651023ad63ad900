//! Bundle naming policy.
//!
//! Bundles are named `release-bundle-<YYYYMMDDHHMMSS>.tar.zst` from the
//! run's UTC start time, so two runs started in the same second collide.

use crate::stamp::RunStamp;
use std::fmt;

/// The fixed prefix for all bundle names.
const BUNDLE_PREFIX: &str = "release-bundle";

/// The fixed file extension for bundles.
const BUNDLE_EXTENSION: &str = ".tar.zst";

/// A bundle file name derived from a run timestamp.
///
/// # Examples
///
/// ```
/// use release_gate::artefact::naming::BundleName;
/// use release_gate::stamp::RunStamp;
///
/// let stamp = RunStamp::parse_compact("20261018093000").expect("valid stamp");
/// assert_eq!(
///     BundleName::new(stamp).filename(),
///     "release-bundle-20261018093000.tar.zst"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleName {
    stamp: RunStamp,
}

impl BundleName {
    /// Name the bundle for the run started at `stamp`.
    #[must_use]
    pub fn new(stamp: RunStamp) -> Self {
        Self { stamp }
    }

    /// Return the run timestamp component.
    #[must_use]
    pub fn stamp(&self) -> RunStamp {
        self.stamp
    }

    /// Return the filename as a string.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BundleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{BUNDLE_PREFIX}-{}{BUNDLE_EXTENSION}",
            self.stamp.compact()
        )
    }
}
