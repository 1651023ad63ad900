//! Unit tests for the release packaging module.

use super::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Tree {
    _dir: TempDir,
    out_dir: Utf8PathBuf,
    bundle_dir: Utf8PathBuf,
}

#[fixture]
fn tree() -> Tree {
    let dir = TempDir::new().expect("temp dir creation succeeds");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let out_dir = root.join("out");
    fs::create_dir_all(out_dir.join("nested")).expect("create out dir");
    fs::write(out_dir.join("b.txt"), b"bravo").expect("write b");
    fs::write(out_dir.join("a.txt"), b"alpha").expect("write a");
    fs::write(out_dir.join("nested").join("c.txt"), b"charlie").expect("write c");
    Tree {
        _dir: dir,
        out_dir,
        bundle_dir: root.join("dist"),
    }
}

#[fixture]
fn stamp() -> RunStamp {
    RunStamp::parse_compact("20260102030405").expect("valid stamp")
}

fn list_bundle_entries(bundle_path: &Utf8Path) -> Vec<String> {
    let file = fs::File::open(bundle_path).expect("open bundle");
    let decoder = zstd::Decoder::new(file).expect("zstd decode");
    let mut archive = tar::Archive::new(decoder);
    archive
        .entries()
        .expect("entries")
        .map(|e| {
            let entry = e.expect("entry");
            entry.path().expect("path").to_string_lossy().into_owned()
        })
        .collect()
}

#[rstest]
fn compute_sha256_of_known_content(tree: Tree) {
    let path = tree.out_dir.join("empty.bin");
    fs::write(&path, b"").expect("write");
    let digest = compute_sha256(path.as_std_path()).expect("sha256 succeeds");
    assert_eq!(
        digest.as_str(),
        concat!(
            "e3b0c44298fc1c149afbf4c8996fb924",
            "27ae41e4649b934ca495991b7852b855"
        )
    );
}

#[rstest]
fn compute_sha256_missing_file_is_io_error(tree: Tree) {
    let result = compute_sha256(tree.out_dir.join("absent").as_std_path());
    assert!(matches!(result, Err(PackagingError::Io(_))));
}

#[rstest]
fn bundle_entries_are_relative_and_sorted(tree: Tree) {
    fs::create_dir_all(&tree.bundle_dir).expect("bundle dir");
    let bundle = tree.bundle_dir.join("test.tar.zst");
    create_bundle(&tree.out_dir, &bundle).expect("bundle creation succeeds");

    let entries: Vec<String> = list_bundle_entries(&bundle)
        .into_iter()
        .map(|e| e.trim_end_matches('/').to_owned())
        .collect();
    assert_eq!(entries, vec!["a.txt", "b.txt", "nested", "nested/c.txt"]);
}

#[rstest]
fn bundle_inside_tree_skips_itself(tree: Tree) {
    let bundle = tree.out_dir.join("self.tar.zst");
    create_bundle(&tree.out_dir, &bundle).expect("bundle creation succeeds");
    assert!(
        !list_bundle_entries(&bundle)
            .iter()
            .any(|e| e.contains("self.tar.zst"))
    );
}

#[rstest]
fn bundle_skips_itself_under_another_spelling(tree: Tree) {
    let bundle = tree.out_dir.join("nested/../self.tar.zst");
    create_bundle(&tree.out_dir, &bundle).expect("bundle creation succeeds");
    let entries = list_bundle_entries(&bundle);
    assert!(!entries.iter().any(|e| e.contains("self.tar.zst")), "{entries:?}");
    assert!(entries.contains(&"a.txt".to_owned()));
}

#[rstest]
fn bundle_dir_inside_out_dir_is_rejected(tree: Tree, stamp: RunStamp) {
    let nested = tree.out_dir.join("nested/../dist");
    let params = PackageParams {
        expected: vec![tree.out_dir.join("a.txt")],
        out_dir: &tree.out_dir,
        bundle_dir: &nested,
        stamp: &stamp,
    };

    let result = package_release(&params);

    assert!(matches!(result, Err(PackagingError::BundleInsideTree { .. })));
    assert!(!tree.out_dir.join("dist/release-bundle-20260102030405.tar.zst").exists());
}

#[rstest]
fn complete_manifest_produces_named_bundle(tree: Tree, stamp: RunStamp) {
    let params = PackageParams {
        expected: vec![tree.out_dir.join("a.txt"), tree.out_dir.join("b.txt")],
        out_dir: &tree.out_dir,
        bundle_dir: &tree.bundle_dir,
        stamp: &stamp,
    };

    let outcome = package_release(&params).expect("packaging succeeds");

    assert!(outcome.manifest.ok());
    let bundle = outcome.bundle.expect("bundle present");
    assert_eq!(
        bundle.path.file_name(),
        Some("release-bundle-20260102030405.tar.zst")
    );
    assert_eq!(
        bundle.sha256,
        compute_sha256(bundle.path.as_std_path()).expect("rehash")
    );
    assert!(
        list_bundle_entries(&bundle.path).contains(&MANIFEST_FILE_NAME.to_owned()),
        "manifest is written before archiving"
    );
}

#[rstest]
fn incomplete_manifest_is_written_without_bundle(tree: Tree, stamp: RunStamp) {
    let params = PackageParams {
        expected: vec![tree.out_dir.join("a.txt"), tree.out_dir.join("missing.pdf")],
        out_dir: &tree.out_dir,
        bundle_dir: &tree.bundle_dir,
        stamp: &stamp,
    };

    let outcome = package_release(&params).expect("packaging succeeds");

    assert!(!outcome.manifest.ok());
    assert!(outcome.bundle.is_none());
    assert!(tree.out_dir.join(MANIFEST_FILE_NAME).is_file());
    assert!(!tree.bundle_dir.exists());
}
