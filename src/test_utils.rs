//! Shared test utilities for the release-gate crate.
#![allow(
    clippy::expect_used,
    reason = "fixture helpers abort the calling test on failure"
)]

use crate::ci::{CiClient, Clock, WorkflowRun};
use crate::http::HttpError;
use crate::release::{NewRelease, ReleaseAsset, ReleaseHost, RemoteRelease};
use camino::Utf8Path;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

/// A workflow run with the given status and conclusion.
pub fn workflow_run(status: &str, conclusion: Option<&str>) -> WorkflowRun {
    WorkflowRun {
        id: 42,
        status: status.to_owned(),
        conclusion: conclusion.map(str::to_owned),
        html_url: "https://github.com/o/r/actions/runs/42".to_owned(),
    }
}

/// A clock that only moves when slept on.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// A clock at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// A CI host that replays scripted responses in order.
///
/// Once the script is exhausted the last response repeats, so a run that
/// never concludes can be scripted with a single entry.
#[derive(Debug)]
pub struct ScriptedCiClient {
    responses: RefCell<VecDeque<Result<Option<WorkflowRun>, HttpError>>>,
    last: RefCell<Result<Option<WorkflowRun>, HttpError>>,
    polls: Cell<u32>,
}

impl ScriptedCiClient {
    /// Replay `responses`, repeating the final one.
    pub fn new(responses: Vec<Result<Option<WorkflowRun>, HttpError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            last: RefCell::new(Ok(None)),
            polls: Cell::new(0),
        }
    }

    /// A run that completes with `conclusion` on the first poll.
    pub fn concluding(conclusion: &str) -> Self {
        Self::new(vec![Ok(Some(workflow_run("completed", Some(conclusion))))])
    }

    /// Number of queries answered.
    pub fn polls(&self) -> u32 {
        self.polls.get()
    }
}

impl CiClient for ScriptedCiClient {
    fn latest_run(&self, _workflow: &str, _branch: &str) -> Result<Option<WorkflowRun>, HttpError> {
        self.polls.set(self.polls.get() + 1);
        if let Some(next) = self.responses.borrow_mut().pop_front() {
            *self.last.borrow_mut() = next;
        }
        self.last.borrow().clone()
    }

    fn dashboard_url(&self, workflow: &str) -> String {
        format!("https://github.com/o/r/actions/workflows/{workflow}")
    }
}

#[derive(Debug)]
struct StoredRelease {
    release: RemoteRelease,
    assets: Vec<(ReleaseAsset, Vec<u8>)>,
}

/// A release host kept in memory.
///
/// Tags are unique and asset names are unique per release, matching what
/// the real host enforces.
#[derive(Debug, Default)]
pub struct InMemoryReleaseHost {
    releases: RefCell<Vec<StoredRelease>>,
    next_id: Cell<u64>,
    create_calls: Cell<usize>,
    upload_calls: Cell<usize>,
    upload_failure: RefCell<Option<HttpError>>,
}

impl InMemoryReleaseHost {
    /// Fail every upload with `error`.
    pub fn fail_uploads_with(&self, error: HttpError) {
        *self.upload_failure.borrow_mut() = Some(error);
    }

    /// Number of `create_release` calls received.
    pub fn create_calls(&self) -> usize {
        self.create_calls.get()
    }

    /// Number of `upload_asset` calls received.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.get()
    }

    /// Number of releases held.
    pub fn release_count(&self) -> usize {
        self.releases.borrow().len()
    }

    /// Asset names on `release_id`, in upload order.
    pub fn asset_names(&self, release_id: u64) -> Vec<String> {
        self.releases
            .borrow()
            .iter()
            .filter(|stored| stored.release.id == release_id)
            .flat_map(|stored| stored.assets.iter().map(|(asset, _)| asset.name.clone()))
            .collect()
    }

    /// Bytes stored under `name` on `release_id`.
    pub fn asset_bytes(&self, release_id: u64, name: &str) -> Option<Vec<u8>> {
        self.releases
            .borrow()
            .iter()
            .filter(|stored| stored.release.id == release_id)
            .flat_map(|stored| stored.assets.iter())
            .find(|(asset, _)| asset.name == name)
            .map(|(_, bytes)| bytes.clone())
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl ReleaseHost for InMemoryReleaseHost {
    fn release_by_tag(&self, tag: &str) -> Result<Option<RemoteRelease>, HttpError> {
        Ok(self
            .releases
            .borrow()
            .iter()
            .find(|stored| stored.release.tag_name == tag)
            .map(|stored| stored.release.clone()))
    }

    fn create_release(&self, release: &NewRelease) -> Result<RemoteRelease, HttpError> {
        self.create_calls.set(self.create_calls.get() + 1);
        if self.release_by_tag(&release.tag_name)?.is_some() {
            return Err(HttpError::Status {
                url: format!("memory://releases/{}", release.tag_name),
                status: 422,
            });
        }
        let id = self.allocate_id();
        let created = RemoteRelease {
            id,
            tag_name: release.tag_name.clone(),
            html_url: format!("https://github.com/o/r/releases/tag/{}", release.tag_name),
        };
        self.releases.borrow_mut().push(StoredRelease {
            release: created.clone(),
            assets: Vec::new(),
        });
        Ok(created)
    }

    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>, HttpError> {
        let releases = self.releases.borrow();
        let stored = releases
            .iter()
            .find(|stored| stored.release.id == release_id)
            .ok_or_else(|| HttpError::NotFound {
                url: format!("memory://releases/{release_id}/assets"),
            })?;
        Ok(stored.assets.iter().map(|(asset, _)| asset.clone()).collect())
    }

    fn upload_asset(
        &self,
        release_id: u64,
        name: &str,
        bytes: &[u8],
    ) -> Result<ReleaseAsset, HttpError> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        if let Some(error) = self.upload_failure.borrow().clone() {
            return Err(error);
        }
        let id = self.allocate_id();
        let mut releases = self.releases.borrow_mut();
        let url = format!("memory://releases/{release_id}/assets?name={name}");
        let stored = releases
            .iter_mut()
            .find(|stored| stored.release.id == release_id)
            .ok_or_else(|| HttpError::NotFound { url: url.clone() })?;
        if stored.assets.iter().any(|(asset, _)| asset.name == name) {
            return Err(HttpError::Status { url, status: 422 });
        }
        let asset = ReleaseAsset {
            id,
            name: name.to_owned(),
            size: bytes.len() as u64,
        };
        stored.assets.push((asset.clone(), bytes.to_vec()));
        Ok(asset)
    }
}

/// Write a minimal PDF with `pages` Letter-sized pages to `path`.
///
/// Each page carries the text `Template page N`. A zero-page file is still
/// a well-formed document.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_template_pdf(path: &Utf8Path, pages: usize) {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(pages);
    for number in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Template page {number}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).expect("page count fits i64");
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document.save(path).expect("template PDF is written");
}
