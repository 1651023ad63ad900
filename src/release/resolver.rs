//! Idempotent release resolution and asset upload.
//!
//! Both operations look before they write: a release is only created after
//! an explicit not-found for its tag, and an asset is only uploaded when no
//! asset of that name is attached yet. Repeating either call is a no-op.

use super::host::{NewRelease, ReleaseHost};
use super::tag::ReleaseTag;
use crate::http::HttpError;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors arising from release resolution or upload.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The host could not be reached or rejected the request.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The local asset could not be read.
    #[error("cannot read asset {path}: {source}")]
    AssetRead {
        /// Local path of the asset.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// What `upload_asset_if_absent` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The asset was uploaded by this call.
    Uploaded,
    /// An asset of that name was already attached; nothing was sent.
    AlreadyPresent,
}

/// Resolves releases and uploads assets against a [`ReleaseHost`].
pub struct ReleaseResolver<'a> {
    host: &'a dyn ReleaseHost,
    target_commitish: Option<String>,
}

impl<'a> ReleaseResolver<'a> {
    /// Resolver over `host`; new tags point at `target_commitish` when set.
    #[must_use]
    pub fn new(host: &'a dyn ReleaseHost, target_commitish: Option<String>) -> Self {
        Self {
            host,
            target_commitish,
        }
    }

    /// Id of the release keyed by `tag`, creating it if the host reports
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Transport`] on any failure other than an
    /// explicit not-found; such failures never lead to a create.
    pub fn resolve_or_create_release(&self, tag: &ReleaseTag) -> Result<u64, ReleaseError> {
        if let Some(existing) = self.host.release_by_tag(tag.name())? {
            log::info!("release for {tag} already exists (id {})", existing.id);
            return Ok(existing.id);
        }
        let created = self.host.create_release(&NewRelease::published(
            tag.name(),
            self.target_commitish.clone(),
        ))?;
        log::info!("created release for {tag} (id {})", created.id);
        Ok(created.id)
    }

    /// Upload `local_path` as `asset_name` unless an asset of that name is
    /// already attached to `release_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Transport`] if listing or uploading fails and
    /// [`ReleaseError::AssetRead`] if the local file cannot be read.
    pub fn upload_asset_if_absent(
        &self,
        release_id: u64,
        local_path: &Utf8Path,
        asset_name: &str,
    ) -> Result<UploadOutcome, ReleaseError> {
        let existing = self.host.list_assets(release_id)?;
        if existing.iter().any(|asset| asset.name == asset_name) {
            log::info!("asset {asset_name} already attached to release {release_id}; skipping");
            return Ok(UploadOutcome::AlreadyPresent);
        }
        let bytes = std::fs::read(local_path).map_err(|source| ReleaseError::AssetRead {
            path: local_path.to_string(),
            source,
        })?;
        self.host.upload_asset(release_id, asset_name, &bytes)?;
        log::info!(
            "uploaded {asset_name} ({} bytes) to release {release_id}",
            bytes.len()
        );
        Ok(UploadOutcome::Uploaded)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
