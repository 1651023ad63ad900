//! Release tags, the release host, and idempotent publication.

pub mod host;
pub mod resolver;
pub mod tag;

pub use host::{GithubReleaseHost, NewRelease, ReleaseAsset, ReleaseHost, RemoteRelease};
pub use resolver::{ReleaseError, ReleaseResolver, UploadOutcome};
pub use tag::{ReleaseTag, TagError};
