//! Unit tests for release resolution and asset upload.

use super::*;
use crate::release::host::{MockReleaseHost, ReleaseAsset, RemoteRelease};
use crate::test_utils::InMemoryReleaseHost;
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Asset {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn asset() -> Asset {
    let dir = TempDir::new().expect("temp dir creation succeeds");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let path = root.join("release-bundle-20260102030405.tar.zst");
    std::fs::write(&path, b"bundle bytes").expect("write asset");
    Asset { _dir: dir, path }
}

#[fixture]
fn tag() -> ReleaseTag {
    ReleaseTag::parse("compliance-20260102030405").expect("valid tag")
}

fn remote(id: u64) -> RemoteRelease {
    RemoteRelease {
        id,
        tag_name: "compliance-20260102030405".to_owned(),
        html_url: String::new(),
    }
}

#[rstest]
fn resolving_twice_creates_one_release(tag: ReleaseTag) {
    let host = InMemoryReleaseHost::default();
    let resolver = ReleaseResolver::new(&host, None);

    let first = resolver.resolve_or_create_release(&tag).expect("first resolve");
    let second = resolver.resolve_or_create_release(&tag).expect("second resolve");

    assert_eq!(first, second);
    assert_eq!(host.create_calls(), 1);
    assert_eq!(host.release_count(), 1);
}

#[rstest]
fn existing_release_is_reused_without_create(tag: ReleaseTag) {
    let mut host = MockReleaseHost::new();
    host.expect_release_by_tag()
        .withf(|t| t == "compliance-20260102030405")
        .times(1)
        .returning(|_| Ok(Some(remote(9))));
    host.expect_create_release().never();

    let id = ReleaseResolver::new(&host, None)
        .resolve_or_create_release(&tag)
        .expect("resolves");

    assert_eq!(id, 9);
}

#[rstest]
#[case::unauthorised(HttpError::Unauthorized { url: "u".to_owned(), status: 401 })]
#[case::transport(HttpError::Transport { url: "u".to_owned(), reason: "timed out".to_owned() })]
#[case::server(HttpError::Status { url: "u".to_owned(), status: 500 })]
fn lookup_failure_never_creates(tag: ReleaseTag, #[case] failure: HttpError) {
    let mut host = MockReleaseHost::new();
    host.expect_release_by_tag()
        .return_once(move |_| Err(failure));
    host.expect_create_release().never();

    let result = ReleaseResolver::new(&host, None).resolve_or_create_release(&tag);

    assert!(matches!(result, Err(ReleaseError::Transport(_))));
}

#[rstest]
fn created_release_carries_target_commitish(tag: ReleaseTag) {
    let mut host = MockReleaseHost::new();
    host.expect_release_by_tag().returning(|_| Ok(None));
    host.expect_create_release()
        .withf(|release| {
            release.tag_name == "compliance-20260102030405"
                && release.target_commitish.as_deref() == Some("main")
                && !release.draft
                && !release.prerelease
        })
        .times(1)
        .returning(|_| Ok(remote(3)));

    let id = ReleaseResolver::new(&host, Some("main".to_owned()))
        .resolve_or_create_release(&tag)
        .expect("creates");

    assert_eq!(id, 3);
}

#[rstest]
fn uploading_twice_leaves_one_asset(tag: ReleaseTag, asset: Asset) {
    let host = InMemoryReleaseHost::default();
    let resolver = ReleaseResolver::new(&host, None);
    let id = resolver.resolve_or_create_release(&tag).expect("resolve");

    let first = resolver
        .upload_asset_if_absent(id, &asset.path, "bundle.tar.zst")
        .expect("first upload");
    let second = resolver
        .upload_asset_if_absent(id, &asset.path, "bundle.tar.zst")
        .expect("second upload");

    assert_eq!(first, UploadOutcome::Uploaded);
    assert_eq!(second, UploadOutcome::AlreadyPresent);
    assert_eq!(host.asset_names(id), vec!["bundle.tar.zst".to_owned()]);
    assert_eq!(host.upload_calls(), 1);
}

#[rstest]
fn existing_asset_is_never_overwritten(asset: Asset) {
    let mut host = MockReleaseHost::new();
    host.expect_list_assets().returning(|_| {
        Ok(vec![ReleaseAsset {
            id: 1,
            name: "manifest.json".to_owned(),
            size: 10,
        }])
    });
    host.expect_upload_asset().never();

    let outcome = ReleaseResolver::new(&host, None)
        .upload_asset_if_absent(4, &asset.path, "manifest.json")
        .expect("no-op");

    assert_eq!(outcome, UploadOutcome::AlreadyPresent);
}

#[rstest]
fn uploads_full_byte_stream(asset: Asset) {
    let mut host = MockReleaseHost::new();
    host.expect_list_assets().returning(|_| Ok(Vec::new()));
    host.expect_upload_asset()
        .withf(|id, name, bytes| *id == 4 && name == "bundle.tar.zst" && bytes == b"bundle bytes")
        .times(1)
        .returning(|_, name, bytes| {
            Ok(ReleaseAsset {
                id: 2,
                name: name.to_owned(),
                size: bytes.len() as u64,
            })
        });

    let outcome = ReleaseResolver::new(&host, None)
        .upload_asset_if_absent(4, &asset.path, "bundle.tar.zst")
        .expect("uploads");

    assert_eq!(outcome, UploadOutcome::Uploaded);
}

#[rstest]
fn unreadable_local_asset_is_reported() {
    let mut host = MockReleaseHost::new();
    host.expect_list_assets().returning(|_| Ok(Vec::new()));
    host.expect_upload_asset().never();

    let result = ReleaseResolver::new(&host, None).upload_asset_if_absent(
        4,
        Utf8Path::new("/nonexistent/bundle.tar.zst"),
        "bundle.tar.zst",
    );

    assert!(matches!(result, Err(ReleaseError::AssetRead { .. })));
}
