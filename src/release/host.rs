//! Release host protocol and its GitHub implementation.

use crate::http::{GithubApi, HttpError};
use serde::{Deserialize, Serialize};

/// Page size used when listing assets.
pub const ASSET_PAGE_SIZE: usize = 100;

/// A release as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    /// Host-assigned id.
    pub id: u64,
    /// The tag the release is keyed by.
    pub tag_name: String,
    /// Browser link to the release.
    #[serde(default)]
    pub html_url: String,
}

/// Parameters of a release to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    /// Tag to key the release by; created on the target if absent.
    pub tag_name: String,
    /// Release title.
    pub name: String,
    /// Commitish the tag points at when the host has to create it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
    /// Always `false`.
    pub draft: bool,
    /// Always `false`.
    pub prerelease: bool,
}

impl NewRelease {
    /// A published, non-prerelease release titled after its tag.
    #[must_use]
    pub fn published(tag_name: &str, target_commitish: Option<String>) -> Self {
        Self {
            tag_name: tag_name.to_owned(),
            name: tag_name.to_owned(),
            target_commitish,
            draft: false,
            prerelease: false,
        }
    }
}

/// An asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Host-assigned id.
    pub id: u64,
    /// Asset file name; unique within its release.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// Trait for the remote release host.
///
/// Abstractions allow tests to exercise the resolver without network
/// access.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseHost {
    /// The release keyed by `tag`, or `None` on an explicit not-found.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for anything other than not-found.
    fn release_by_tag(&self, tag: &str) -> Result<Option<RemoteRelease>, HttpError>;

    /// Create a release.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the host rejects the request.
    fn create_release(&self, release: &NewRelease) -> Result<RemoteRelease, HttpError>;

    /// Every asset currently attached to `release_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if any page cannot be fetched.
    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>, HttpError>;

    /// Upload `bytes` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the host rejects the upload.
    fn upload_asset(
        &self,
        release_id: u64,
        name: &str,
        bytes: &[u8],
    ) -> Result<ReleaseAsset, HttpError>;
}

/// GitHub Releases client.
#[derive(Debug, Clone)]
pub struct GithubReleaseHost {
    api: GithubApi,
    uploads: GithubApi,
    owner: String,
    repo: String,
}

impl GithubReleaseHost {
    /// Client for `owner/repo`, uploading through `uploads`.
    #[must_use]
    pub fn new(api: GithubApi, uploads: GithubApi, owner: &str, repo: &str) -> Self {
        Self {
            api,
            uploads,
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        }
    }

    /// `{base}/repos/{owner}/{repo}/releases/...` on `api`.
    fn releases_endpoint(&self, api: &GithubApi, rest: &[&str]) -> Result<String, HttpError> {
        let mut segments = vec!["repos", self.owner.as_str(), self.repo.as_str(), "releases"];
        segments.extend_from_slice(rest);
        api.endpoint(&segments)
    }
}

impl ReleaseHost for GithubReleaseHost {
    fn release_by_tag(&self, tag: &str) -> Result<Option<RemoteRelease>, HttpError> {
        let url = self.releases_endpoint(&self.api, &["tags", tag])?;
        match self.api.get_json(&url, &[]) {
            Ok(release) => Ok(Some(release)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_release(&self, release: &NewRelease) -> Result<RemoteRelease, HttpError> {
        let url = self.releases_endpoint(&self.api, &[])?;
        self.api.post_json(&url, release)
    }

    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>, HttpError> {
        let id = release_id.to_string();
        let url = self.releases_endpoint(&self.api, &[id.as_str(), "assets"])?;
        let per_page = ASSET_PAGE_SIZE.to_string();
        let mut assets = Vec::new();
        for page in 1_u32.. {
            let page_number = page.to_string();
            let batch: Vec<ReleaseAsset> = self.api.get_json(
                &url,
                &[("per_page", per_page.as_str()), ("page", page_number.as_str())],
            )?;
            let short = batch.len() < ASSET_PAGE_SIZE;
            assets.extend(batch);
            if short {
                break;
            }
        }
        Ok(assets)
    }

    fn upload_asset(
        &self,
        release_id: u64,
        name: &str,
        bytes: &[u8],
    ) -> Result<ReleaseAsset, HttpError> {
        let id = release_id.to_string();
        let url = self.releases_endpoint(&self.uploads, &[id.as_str(), "assets"])?;
        self.uploads.post_bytes(&url, &[("name", name)], bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_release_is_published_and_titled_after_tag() {
        let release = NewRelease::published("compliance-20260102030405", None);
        let json = serde_json::to_value(&release).expect("serialise");
        assert_eq!(json["name"], "compliance-20260102030405");
        assert_eq!(json["draft"], false);
        assert_eq!(json["prerelease"], false);
        assert!(json.get("target_commitish").is_none());
    }

    #[test]
    fn target_commitish_is_sent_when_configured() {
        let release = NewRelease::published("t-20260102030405", Some("main".to_owned()));
        let json = serde_json::to_value(&release).expect("serialise");
        assert_eq!(json["target_commitish"], "main");
    }

    #[test]
    fn release_and_assets_decode_from_host_json() {
        let release: RemoteRelease = serde_json::from_str(
            r#"{"id": 5, "tag_name": "t-20260102030405", "draft": false, "assets": []}"#,
        )
        .expect("release decodes");
        assert_eq!(release.id, 5);

        let assets: Vec<ReleaseAsset> = serde_json::from_str(
            r#"[{"id": 1, "name": "manifest.json", "size": 42, "state": "uploaded"}]"#,
        )
        .expect("assets decode");
        assert_eq!(assets[0].name, "manifest.json");
    }
}
