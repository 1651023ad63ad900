//! Annotated coverage document.
//!
//! Stamps a summary overlay onto page 1 of an externally supplied PDF
//! template. Only the template's page count and page-1 geometry are
//! inspected; every other page is carried over untouched.

use super::error::{ArtefactBuildError, Result};
use super::record::{Artefact, ArtefactKind};
use crate::stamp::RunStamp;
use camino::Utf8Path;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use release_gate_common::{CoverageRow, CoverageTable};

/// Rows rendered in the overlay table.
pub const OVERLAY_ROW_LIMIT: usize = 12;

/// US Letter, used when no media box is declared anywhere up the page tree.
const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Parent links followed before giving up on an inherited attribute.
const MAX_INHERITANCE_DEPTH: usize = 32;

const MARGIN: f32 = 36.0;
const LEADING: f32 = 12.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 8.0;

/// Column x-offsets and character limits for the overlay table.
const TABLE_COLUMNS: [(f32, usize); 5] = [(0.0, 12), (62.0, 7), (104.0, 6), (140.0, 32), (300.0, 44)];

/// Inputs for [`build_document`].
#[derive(Debug)]
pub struct DocumentParams<'a> {
    /// The PDF template to stamp.
    pub template: &'a Utf8Path,
    /// Destination PDF path.
    pub output_path: &'a Utf8Path,
    /// Printed as the generation timestamp.
    pub generated_at: &'a RunStamp,
    /// Printed as the source label, normally the coverage input path.
    pub source_label: &'a str,
}

/// Stamp the coverage overlay onto page 1 of the template.
///
/// # Errors
///
/// Returns [`ArtefactBuildError::TemplateMissing`] when the template does
/// not exist, [`ArtefactBuildError::TemplateUnreadable`] when it cannot be
/// parsed, [`ArtefactBuildError::EmptyTemplate`] when it has no pages, and
/// [`ArtefactBuildError::Write`] when the output cannot be saved.
pub fn build_document(table: &CoverageTable, params: &DocumentParams<'_>) -> Result<Artefact> {
    let mut document = load_template(params.template)?;
    let pages = document.get_pages();
    let Some(&first_page) = pages.values().next() else {
        return Err(ArtefactBuildError::EmptyTemplate {
            path: params.template.to_string(),
        });
    };
    let page_count = pages.len();

    let media_box = media_box(&document, first_page);
    let mut resources = inherited(&document, first_page, b"Resources")
        .and_then(|object| resolve_dict(&document, object))
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|object| resolve_dict(&document, object))
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let font_name = unique_font_name(&fonts);

    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(font_name.as_bytes(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let overlay = Overlay::new(table, params).render(media_box, &font_name);
    let overlay = encode(params, overlay)?;
    let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = document.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = vec![Object::Reference(save_id)];
    contents.extend(existing_contents(&document, first_page));
    contents.push(Object::Reference(overlay_id));

    let page = document
        .get_object_mut(first_page)
        .and_then(Object::as_dict_mut)
        .map_err(|e| unreadable(params.template, &e))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));

    document
        .save(params.output_path)
        .map_err(|e| ArtefactBuildError::Write {
            path: params.output_path.to_string(),
            reason: e.to_string(),
        })?;
    log::info!(
        "wrote document {} ({page_count} page(s)) from template {}",
        params.output_path,
        params.template
    );
    Ok(Artefact::record(ArtefactKind::Document, params.output_path)?)
}

/// Number of pages in the PDF at `path`.
///
/// # Errors
///
/// Returns [`ArtefactBuildError::TemplateMissing`] or
/// [`ArtefactBuildError::TemplateUnreadable`] when the file cannot be read.
pub fn page_count(path: &Utf8Path) -> Result<usize> {
    Ok(load_template(path)?.get_pages().len())
}

fn load_template(path: &Utf8Path) -> Result<Document> {
    if !path.is_file() {
        return Err(ArtefactBuildError::TemplateMissing {
            path: path.to_string(),
        });
    }
    Document::load(path).map_err(|e| unreadable(path, &e))
}

fn unreadable(path: &Utf8Path, error: &lopdf::Error) -> ArtefactBuildError {
    ArtefactBuildError::TemplateUnreadable {
        path: path.to_string(),
        reason: error.to_string(),
    }
}

fn encode(params: &DocumentParams<'_>, operations: Vec<Operation>) -> Result<Vec<u8>> {
    let mut bytes = b"Q\n".to_vec();
    let body = Content { operations }
        .encode()
        .map_err(|e| ArtefactBuildError::Write {
            path: params.output_path.to_string(),
            reason: e.to_string(),
        })?;
    bytes.extend(body);
    Ok(bytes)
}

/// Look `key` up on the page, then on each ancestor in the page tree.
fn inherited<'a>(document: &'a Document, page: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = document.get_dictionary(page).ok();
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let dict = node?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        node = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|parent| document.get_dictionary(parent))
            .ok();
    }
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object).and_then(|o| o.as_dict().ok())
}

fn media_box(document: &Document, page: ObjectId) -> [f32; 4] {
    let corners: Option<Vec<f32>> = inherited(document, page, b"MediaBox")
        .and_then(|object| resolve(document, object))
        .and_then(|object| object.as_array().ok())
        .map(|values| {
            values
                .iter()
                .filter_map(|value| resolve(document, value))
                .filter_map(|value| value.as_float().ok())
                .collect()
        });
    match corners.as_deref() {
        Some(&[llx, lly, urx, ury]) => [llx, lly, urx, ury],
        _ => LETTER,
    }
}

fn existing_contents(document: &Document, page: ObjectId) -> Vec<Object> {
    let Ok(page) = document.get_dictionary(page) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Array(streams)) => streams.clone(),
        Ok(object @ Object::Reference(_)) => vec![object.clone()],
        _ => Vec::new(),
    }
}

fn unique_font_name(fonts: &Dictionary) -> String {
    (1..)
        .map(|n| format!("RGOverlay{n}"))
        .find(|name| !fonts.has(name.as_bytes()))
        .unwrap_or_else(|| "RGOverlay".to_owned())
}

/// Printable ASCII only; anything else becomes `?`.
fn sanitise(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn truncate(text: &str, limit: usize) -> String {
    let clean = sanitise(text);
    if clean.len() <= limit {
        return clean;
    }
    let keep = limit.saturating_sub(3);
    format!("{}...", &clean[..keep])
}

struct Line {
    size: f32,
    cells: Vec<(f32, String)>,
}

impl Line {
    fn text(size: f32, text: &str) -> Self {
        Self {
            size,
            cells: vec![(0.0, sanitise(text))],
        }
    }

    fn row(cells: [&str; 5]) -> Self {
        Self {
            size: BODY_SIZE,
            cells: TABLE_COLUMNS
                .iter()
                .zip(cells)
                .map(|(&(offset, limit), cell)| (offset, truncate(cell, limit)))
                .collect(),
        }
    }
}

struct Overlay {
    lines: Vec<Line>,
}

impl Overlay {
    fn new(table: &CoverageTable, params: &DocumentParams<'_>) -> Self {
        let summary = table.summary();
        let mut lines = vec![
            Line::text(TITLE_SIZE, "Compliance coverage"),
            Line::text(BODY_SIZE, &format!("Generated: {}", params.generated_at.rfc3339())),
            Line::text(BODY_SIZE, &format!("Source: {}", params.source_label)),
            Line::text(
                BODY_SIZE,
                &format!(
                    "Total: {}   Covered: {}   Gaps: {}",
                    summary.total, summary.covered, summary.gaps
                ),
            ),
            Line::row(["Requirement", "Covered", "Count", "QuestionIDs", "ProposedAddIfGap"]),
        ];
        lines.extend(table.rows().iter().take(OVERLAY_ROW_LIMIT).map(row_line));
        let hidden = table.rows().len().saturating_sub(OVERLAY_ROW_LIMIT);
        if hidden > 0 {
            lines.push(Line::text(BODY_SIZE, &format!("... {hidden} more row(s)")));
        }
        Self { lines }
    }

    fn render(&self, media_box: [f32; 4], font_name: &str) -> Vec<Operation> {
        let [llx, _, urx, ury] = media_box;
        let left = llx + MARGIN;
        let top = ury - MARGIN;
        let width = (urx - llx - 2.0 * MARGIN).max(0.0);
        #[expect(clippy::cast_precision_loss, reason = "overlay has a few dozen lines")]
        let height = LEADING * (self.lines.len() as f32 + 1.0);

        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![Object::Real(0.96), Object::Real(0.96), Object::Real(0.9)]),
            Operation::new(
                "re",
                vec![
                    Object::Real(left),
                    Object::Real(top - height),
                    Object::Real(width),
                    Object::Real(height),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("rg", vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
            Operation::new("BT", vec![]),
        ];
        let mut baseline = top - LEADING;
        for line in &self.lines {
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(font_name.as_bytes().to_vec()), Object::Real(line.size)],
            ));
            for (offset, text) in &line.cells {
                ops.push(Operation::new(
                    "Tm",
                    vec![
                        Object::Integer(1),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(1),
                        Object::Real(left + 6.0 + offset),
                        Object::Real(baseline),
                    ],
                ));
                ops.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
            }
            baseline -= LEADING;
        }
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));
        ops
    }
}

fn row_line(row: &CoverageRow) -> Line {
    let count = row.count.to_string();
    let question_ids = row.question_ids_cell();
    Line::row([
        &row.requirement,
        row.covered.as_str(),
        &count,
        &question_ids,
        &row.proposed_add_if_gap,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_template_pdf;
    use camino::Utf8PathBuf;
    use release_gate_common::test_support::complete_table;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Scratch {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = TempDir::new().expect("temp dir creation succeeds");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        Scratch { _dir: dir, root }
    }

    fn stamp() -> RunStamp {
        RunStamp::parse_compact("20260102030405").expect("valid stamp")
    }

    fn build(scratch: &Scratch, template: &Utf8Path) -> Result<Artefact> {
        let generated_at = stamp();
        let output = scratch.root.join("annotated.pdf");
        build_document(
            &complete_table(),
            &DocumentParams {
                template,
                output_path: &output,
                generated_at: &generated_at,
                source_label: "out/coverage.csv",
            },
        )
    }

    #[rstest]
    #[case::single(1)]
    #[case::two(2)]
    #[case::several(5)]
    fn keeps_every_template_page(scratch: Scratch, #[case] pages: usize) {
        let template = scratch.root.join("template.pdf");
        write_template_pdf(&template, pages);

        let artefact = build(&scratch, &template).expect("document builds");

        assert_eq!(artefact.kind(), ArtefactKind::Document);
        assert_eq!(page_count(artefact.path()).expect("readable"), pages);
    }

    #[rstest]
    fn overlay_lands_on_first_page_only(scratch: Scratch) {
        let template = scratch.root.join("template.pdf");
        write_template_pdf(&template, 2);
        let artefact = build(&scratch, &template).expect("document builds");

        let document = Document::load(artefact.path()).expect("reload");
        let pages: Vec<ObjectId> = document.get_pages().values().copied().collect();
        let first = document.get_page_content(pages[0]).expect("page 1 content");
        let second = document.get_page_content(pages[1]).expect("page 2 content");
        let first = String::from_utf8_lossy(&first);
        assert!(first.contains("Total: 17"));
        assert!(first.contains("Gaps: 0"));
        assert!(!String::from_utf8_lossy(&second).contains("Compliance coverage"));
    }

    #[rstest]
    fn zero_page_template_is_rejected(scratch: Scratch) {
        let template = scratch.root.join("empty.pdf");
        write_template_pdf(&template, 0);
        assert!(matches!(
            build(&scratch, &template),
            Err(ArtefactBuildError::EmptyTemplate { .. })
        ));
    }

    #[rstest]
    fn missing_template_is_rejected(scratch: Scratch) {
        let template = scratch.root.join("absent.pdf");
        assert!(matches!(
            build(&scratch, &template),
            Err(ArtefactBuildError::TemplateMissing { .. })
        ));
    }

    #[rstest]
    fn garbage_template_is_unreadable(scratch: Scratch) {
        let template = scratch.root.join("garbage.pdf");
        std::fs::write(&template, b"this is not a pdf").expect("write");
        assert!(matches!(
            build(&scratch, &template),
            Err(ArtefactBuildError::TemplateUnreadable { .. })
        ));
    }

    #[rstest]
    #[case::short("CR1", 12, "CR1")]
    #[case::exact("abcdef", 6, "abcdef")]
    #[case::long("abcdefghij", 6, "abc...")]
    #[case::non_ascii("caf\u{e9}", 12, "caf?")]
    fn cells_are_sanitised_and_truncated(
        #[case] text: &str,
        #[case] limit: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate(text, limit), expected);
    }

    #[test]
    fn overlay_caps_table_rows() {
        let table = complete_table();
        let generated_at = stamp();
        let params = DocumentParams {
            template: Utf8Path::new("unused.pdf"),
            output_path: Utf8Path::new("unused-out.pdf"),
            generated_at: &generated_at,
            source_label: "coverage.csv",
        };
        let overlay = Overlay::new(&table, &params);
        // title, generated, source, summary, header, 12 rows, overflow note
        assert_eq!(overlay.lines.len(), 5 + OVERLAY_ROW_LIMIT + 1);
    }

    #[test]
    fn font_name_avoids_existing_entries() {
        let mut fonts = Dictionary::new();
        fonts.set("RGOverlay1", Object::Null);
        assert_eq!(unique_font_name(&fonts), "RGOverlay2");
    }
}
