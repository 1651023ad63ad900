//! Constrained coverage workbook.
//!
//! Writes the coverage table as an Office Open XML workbook (a zip archive
//! of XML parts) whose `Covered` column carries a list-type data validation
//! restricted to `Y` and `N`. The allowed values are either spelled inline in
//! the validation formula or kept on a hidden `Lists` sheet behind the
//! workbook-level name `CoveredValues`.
//!
//! The reader half reopens a workbook and resolves that validation back to
//! its literal value set, whichever form was used.

use super::error::{ArtefactBuildError, Result};
use super::record::{Artefact, ArtefactKind};
use crate::stamp::RunStamp;
use camino::Utf8Path;
use release_gate_common::{CANONICAL_COLUMNS, CoverageRow, CoverageTable};
use serde::{Deserialize, Serialize};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use std::fs::File;
use std::io::{Read, Write};
use zip::ZipArchive;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Values the `Covered` column accepts.
pub const COVERED_VALUES: [&str; 2] = ["Y", "N"];

/// Name of the data sheet.
const DATA_SHEET: &str = "Coverage";

/// Name of the hidden enumeration sheet.
const LIST_SHEET: &str = "Lists";

/// Workbook-level name referencing the enumeration range.
const DEFINED_NAME: &str = "CoveredValues";

const SHEET_PATH: &str = "xl/worksheets/sheet1.xml";
const LIST_SHEET_PATH: &str = "xl/worksheets/sheet2.xml";
const WORKBOOK_PATH: &str = "xl/workbook.xml";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// How the allowed values are attached to the validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintForm {
    /// Values spelled in the formula, e.g. `"Y,N"`.
    Inline,
    /// Values on a hidden sheet referenced through a defined name.
    #[default]
    Range,
}

/// Inputs for [`build_spreadsheet`].
#[derive(Debug)]
pub struct SpreadsheetParams<'a> {
    /// Destination `.xlsx` path.
    pub output_path: &'a Utf8Path,
    /// How the allowed values are attached.
    pub form: ConstraintForm,
    /// Recorded in the workbook's core properties.
    pub generated_at: &'a RunStamp,
}

/// A list-type validation as found on reopening a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConstraint {
    /// The validation type, `list` for an enumerated-value constraint.
    pub kind: String,
    /// The cell range the validation covers, e.g. `B2:B18`.
    pub range: String,
    /// The literal values the range accepts.
    pub values: Vec<String>,
}

impl ListConstraint {
    /// `true` when this is a list constraint over exactly `Y` and `N`.
    #[must_use]
    pub fn restricts_to_covered_values(&self) -> bool {
        let mut values: Vec<&str> = self.values.iter().map(String::as_str).collect();
        values.sort_unstable();
        self.kind == "list" && values == ["N", "Y"]
    }
}

/// Write `table` as a constrained workbook.
///
/// # Errors
///
/// Returns [`ArtefactBuildError::Write`] if the workbook cannot be written
/// and [`ArtefactBuildError::Record`] if it cannot be checksummed.
pub fn build_spreadsheet(table: &CoverageTable, params: &SpreadsheetParams<'_>) -> Result<Artefact> {
    let parts = workbook_parts(table.rows(), params);
    write_zip(params.output_path, &parts).map_err(|reason| ArtefactBuildError::Write {
        path: params.output_path.to_string(),
        reason,
    })?;
    log::info!(
        "wrote spreadsheet {} with {} data row(s)",
        params.output_path,
        table.rows().len()
    );
    Ok(Artefact::record(ArtefactKind::Spreadsheet, params.output_path)?)
}

/// Covered cell range for `row_count` data rows (rows 2..N+1).
#[must_use]
pub fn covered_range(row_count: usize) -> String {
    format!("B2:B{}", row_count.max(1) + 1)
}

fn workbook_parts(rows: &[CoverageRow], params: &SpreadsheetParams<'_>) -> Vec<(&'static str, String)> {
    let with_list = params.form == ConstraintForm::Range;
    let mut parts = vec![
        ("[Content_Types].xml", content_types(with_list)),
        ("_rels/.rels", root_rels()),
        ("docProps/core.xml", core_properties(params.generated_at)),
        (WORKBOOK_PATH, workbook(with_list)),
        ("xl/_rels/workbook.xml.rels", workbook_rels(with_list)),
        (SHEET_PATH, data_sheet(rows, params.form)),
    ];
    if with_list {
        parts.push((LIST_SHEET_PATH, list_sheet()));
    }
    parts
}

fn write_zip(path: &Utf8Path, parts: &[(&str, String)]) -> std::result::Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(*name, options).map_err(|e| e.to_string())?;
        zip.write_all(body.as_bytes()).map_err(|e| e.to_string())?;
    }
    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

fn content_types(with_list: bool) -> String {
    let sheet_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
    let list_override = if with_list {
        format!(r#"<Override PartName="/{LIST_SHEET_PATH}" ContentType="{sheet_type}"/>"#)
    } else {
        String::new()
    };
    format!(
        concat!(
            "{decl}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/{workbook}" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/{sheet}" ContentType="{sheet_type}"/>"#,
            "{list_override}",
            r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
            "</Types>"
        ),
        decl = XML_DECL,
        workbook = WORKBOOK_PATH,
        sheet = SHEET_PATH,
        sheet_type = sheet_type,
        list_override = list_override,
    )
}

fn root_rels() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{rel}/officeDocument" Target="{workbook}"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
            "</Relationships>"
        ),
        decl = XML_DECL,
        rel = REL_NS,
        workbook = WORKBOOK_PATH,
    )
}

fn core_properties(generated_at: &RunStamp) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>Compliance coverage</dc:title>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
            "</cp:coreProperties>"
        ),
        decl = XML_DECL,
        created = generated_at.rfc3339(),
    )
}

fn workbook(with_list: bool) -> String {
    let (list_sheet, defined_names) = if with_list {
        (
            format!(r#"<sheet name="{LIST_SHEET}" sheetId="2" state="hidden" r:id="rId2"/>"#),
            format!(
                r#"<definedNames><definedName name="{DEFINED_NAME}">{LIST_SHEET}!$A$1:$A${}</definedName></definedNames>"#,
                COVERED_VALUES.len()
            ),
        )
    } else {
        (String::new(), String::new())
    };
    format!(
        concat!(
            "{decl}",
            r#"<workbook xmlns="{main}" xmlns:r="{rel}">"#,
            r#"<sheets><sheet name="{data}" sheetId="1" r:id="rId1"/>{list_sheet}</sheets>"#,
            "{defined_names}",
            "</workbook>"
        ),
        decl = XML_DECL,
        main = MAIN_NS,
        rel = REL_NS,
        data = DATA_SHEET,
        list_sheet = list_sheet,
        defined_names = defined_names,
    )
}

fn workbook_rels(with_list: bool) -> String {
    let list_rel = if with_list {
        format!(r#"<Relationship Id="rId2" Type="{REL_NS}/worksheet" Target="worksheets/sheet2.xml"/>"#)
    } else {
        String::new()
    };
    format!(
        concat!(
            "{decl}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{rel}/worksheet" Target="worksheets/sheet1.xml"/>"#,
            "{list_rel}",
            "</Relationships>"
        ),
        decl = XML_DECL,
        rel = REL_NS,
        list_rel = list_rel,
    )
}

fn data_sheet(rows: &[CoverageRow], form: ConstraintForm) -> String {
    let mut sheet_data = String::from("<sheetData>");
    let header: Vec<Cell> = CANONICAL_COLUMNS.iter().map(|c| Cell::Text((*c).to_owned())).collect();
    sheet_data.push_str(&row_xml(1, &header));
    for (index, row) in rows.iter().enumerate() {
        let cells = [
            Cell::Text(row.requirement.clone()),
            Cell::Text(row.covered.as_str().to_owned()),
            Cell::Number(row.count),
            Cell::Text(row.question_ids_cell()),
            Cell::Text(row.proposed_add_if_gap.clone()),
        ];
        sheet_data.push_str(&row_xml(index + 2, &cells));
    }
    sheet_data.push_str("</sheetData>");

    let formula = match form {
        ConstraintForm::Inline => format!("\"{}\"", COVERED_VALUES.join(",")),
        ConstraintForm::Range => DEFINED_NAME.to_owned(),
    };
    format!(
        concat!(
            "{decl}",
            r#"<worksheet xmlns="{main}">"#,
            "{sheet_data}",
            r#"<dataValidations count="1">"#,
            r#"<dataValidation type="list" allowBlank="0" showErrorMessage="1" "#,
            r#"errorTitle="Covered" error="Covered must be Y or N" sqref="{range}">"#,
            "<formula1>{formula}</formula1>",
            "</dataValidation></dataValidations>",
            "</worksheet>"
        ),
        decl = XML_DECL,
        main = MAIN_NS,
        sheet_data = sheet_data,
        range = covered_range(rows.len()),
        formula = escape(&formula),
    )
}

fn list_sheet() -> String {
    let rows: String = COVERED_VALUES
        .iter()
        .enumerate()
        .map(|(index, value)| row_xml(index + 1, &[Cell::Text((*value).to_owned())]))
        .collect();
    format!(
        r#"{XML_DECL}<worksheet xmlns="{MAIN_NS}"><sheetData>{rows}</sheetData></worksheet>"#
    )
}

enum Cell {
    Text(String),
    Number(u32),
}

const COLUMN_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

fn row_xml(row_number: usize, cells: &[Cell]) -> String {
    let mut xml = format!(r#"<row r="{row_number}">"#);
    for (letter, cell) in COLUMN_LETTERS.iter().zip(cells) {
        match cell {
            Cell::Text(text) => xml.push_str(&format!(
                r#"<c r="{letter}{row_number}" t="inlineStr"><is><t>{}</t></is></c>"#,
                escape(text)
            )),
            Cell::Number(value) => {
                xml.push_str(&format!(r#"<c r="{letter}{row_number}"><v>{value}</v></c>"#));
            }
        }
    }
    xml.push_str("</row>");
    xml
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reopen a workbook and resolve the validation on its data sheet.
///
/// Accepts the parts as this module writes them and as spreadsheet
/// applications re-save them: attributes in any order, prefixed
/// extension elements, and shared-string cells.
///
/// # Errors
///
/// Returns [`ArtefactBuildError::SpreadsheetUnreadable`] when the workbook
/// cannot be opened or carries no list validation, or when a referenced
/// range cannot be resolved.
pub fn read_covered_constraint(path: &Utf8Path) -> Result<ListConstraint> {
    let mut workbook = WorkbookReader::open(path)?;
    let sheet_path = workbook.data_sheet_path()?;
    let sheet = workbook.part(&sheet_path)?;
    let validation = workbook
        .parsed(&sheet_path, first_validation(&sheet))?
        .ok_or_else(|| workbook.unreadable("data sheet has no data validation"))?;
    let formula = validation.formula.trim();
    if formula.is_empty() {
        return Err(workbook.unreadable("data validation has no formula"));
    }

    let values = match formula.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
        Some(inline) => inline.split(',').map(str::to_owned).collect(),
        None => workbook.resolve_reference(formula)?,
    };
    Ok(ListConstraint {
        kind: validation.kind,
        range: validation.range.trim().to_owned(),
        values,
    })
}

/// Number of rows on the data sheet, header included.
///
/// # Errors
///
/// Returns [`ArtefactBuildError::SpreadsheetUnreadable`] when the workbook
/// cannot be opened.
pub fn read_row_count(path: &Utf8Path) -> Result<usize> {
    let mut workbook = WorkbookReader::open(path)?;
    let sheet_path = workbook.data_sheet_path()?;
    let sheet = workbook.part(&sheet_path)?;
    let mut rows = 0;
    let counted = walk(&sheet, |node| {
        if matches!(node, Node::Open(element) if element.local_name().as_ref() == b"row") {
            rows += 1;
        }
        Ok(())
    });
    workbook.parsed(&sheet_path, counted)?;
    Ok(rows)
}

const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";

struct WorkbookReader {
    path: String,
    archive: ZipArchive<File>,
}

impl WorkbookReader {
    fn open(path: &Utf8Path) -> Result<Self> {
        let unreadable = |reason: String| ArtefactBuildError::SpreadsheetUnreadable {
            path: path.to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let archive = ZipArchive::new(file).map_err(|e| unreadable(e.to_string()))?;
        Ok(Self {
            path: path.to_string(),
            archive,
        })
    }

    fn unreadable(&self, reason: impl Into<String>) -> ArtefactBuildError {
        ArtefactBuildError::SpreadsheetUnreadable {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn parsed<T>(&self, part: &str, result: XmlResult<T>) -> Result<T> {
        result.map_err(|e| self.unreadable(format!("{part}: {e}")))
    }

    fn part(&mut self, name: &str) -> Result<String> {
        match self.optional_part(name)? {
            Some(body) => Ok(body),
            None => Err(self.unreadable(format!("{name}: part not found"))),
        }
    }

    fn optional_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut body = String::new();
        let read = match self.archive.by_name(name) {
            Ok(mut entry) => entry.read_to_string(&mut body).map_err(|e| e.to_string()),
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => Err(e.to_string()),
        };
        match read {
            Ok(_) => Ok(Some(body)),
            Err(reason) => Err(self.unreadable(format!("{name}: {reason}"))),
        }
    }

    /// The data sheet's part, found by name; the first sheet otherwise.
    fn data_sheet_path(&mut self) -> Result<String> {
        match self.sheet_path(DATA_SHEET)? {
            Some(path) => Ok(path),
            None => Ok(SHEET_PATH.to_owned()),
        }
    }

    /// Resolve a defined name or `Sheet!$A$1:$A$2` reference to cell values.
    fn resolve_reference(&mut self, reference: &str) -> Result<Vec<String>> {
        let target = if reference.contains('!') {
            reference.to_owned()
        } else {
            let workbook = self.part(WORKBOOK_PATH)?;
            self.parsed(WORKBOOK_PATH, defined_name(&workbook, reference))?
                .ok_or_else(|| self.unreadable(format!("defined name {reference} not found")))?
        };
        let (sheet_name, range) = target
            .trim()
            .split_once('!')
            .ok_or_else(|| self.unreadable(format!("malformed reference {target}")))?;
        let sheet_name = sheet_name.trim_matches('\'');
        let sheet_path = self
            .sheet_path(sheet_name)?
            .ok_or_else(|| self.unreadable(format!("sheet {sheet_name} not found")))?;
        let bounds = CellRange::parse(range)
            .ok_or_else(|| self.unreadable(format!("unsupported range {range}")))?;

        let sheet = self.part(&sheet_path)?;
        let shared = match self.optional_part(SHARED_STRINGS_PATH)? {
            Some(xml) => self.parsed(SHARED_STRINGS_PATH, shared_strings(&xml))?,
            None => Vec::new(),
        };
        let cells = self.parsed(&sheet_path, cells(&sheet, &shared))?;
        Ok(cells
            .into_iter()
            .filter(|(reference, _)| bounds.contains(reference))
            .map(|(_, value)| value)
            .collect())
    }

    fn sheet_path(&mut self, sheet_name: &str) -> Result<Option<String>> {
        let workbook = self.part(WORKBOOK_PATH)?;
        let lookup = lookup_attribute(&workbook, b"sheet", "name", sheet_name, "id");
        let Some(rel_id) = self.parsed(WORKBOOK_PATH, lookup)? else {
            return Ok(None);
        };
        let rels = self.part(WORKBOOK_RELS_PATH)?;
        let target = self
            .parsed(
                WORKBOOK_RELS_PATH,
                lookup_attribute(&rels, b"Relationship", "Id", &rel_id, "Target"),
            )?
            .ok_or_else(|| self.unreadable(format!("relationship {rel_id} not found")))?;
        Ok(Some(format!(
            "xl/{}",
            target.trim_start_matches('/').trim_start_matches("xl/")
        )))
    }
}

type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

/// One step through an XML part. Self-closing elements yield an `Open`
/// immediately followed by a `Close`. Names are local, without prefix.
enum Node<'e> {
    Open(&'e BytesStart<'e>),
    Text(&'e str),
    Close(&'e [u8]),
}

fn walk<F>(xml: &str, mut visit: F) -> XmlResult<()>
where
    F: FnMut(Node<'_>) -> XmlResult<()>,
{
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) => visit(Node::Open(&element))?,
            Event::Empty(element) => {
                visit(Node::Open(&element))?;
                visit(Node::Close(element.local_name().as_ref()))?;
            }
            Event::End(element) => visit(Node::Close(element.local_name().as_ref()))?,
            Event::Text(text) => visit(Node::Text(&text.unescape()?))?,
            Event::CData(data) => visit(Node::Text(&String::from_utf8_lossy(&data)))?,
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

/// Unescaped value of the attribute whose local name is `name`.
fn attribute(element: &BytesStart<'_>, name: &str) -> XmlResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `want` on the first `element` whose `key` attribute equals `value`.
fn lookup_attribute(
    xml: &str,
    element: &[u8],
    key: &str,
    value: &str,
    want: &str,
) -> XmlResult<Option<String>> {
    let mut found = None;
    walk(xml, |node| {
        match node {
            Node::Open(candidate)
                if found.is_none() && candidate.local_name().as_ref() == element =>
            {
                if attribute(candidate, key)?.as_deref() == Some(value) {
                    found = attribute(candidate, want)?;
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(found)
}

/// Text of the workbook-level `definedName` called `name`.
fn defined_name(workbook: &str, name: &str) -> XmlResult<Option<String>> {
    let mut found: Option<String> = None;
    let mut capturing = false;
    walk(workbook, |node| {
        match node {
            Node::Open(element) if element.local_name().as_ref() == b"definedName" => {
                capturing = found.is_none()
                    && attribute(element, "name")?.as_deref() == Some(name)
                    && attribute(element, "localSheetId")?.is_none();
                if capturing {
                    found = Some(String::new());
                }
            }
            Node::Text(text) if capturing => {
                if let Some(value) = found.as_mut() {
                    value.push_str(text);
                }
            }
            Node::Close(b"definedName") => capturing = false,
            _ => {}
        }
        Ok(())
    })?;
    Ok(found)
}

/// A data validation as written on a worksheet, before its formula is
/// resolved.
#[derive(Debug, Default)]
struct SheetValidation {
    kind: String,
    range: String,
    formula: String,
}

#[derive(Clone, Copy)]
enum ValidationField {
    Formula,
    Range,
}

/// The first data validation on a worksheet, in either the core form
/// (`sqref` attribute, `formula1` text) or the extension form (`xm:sqref`
/// and `xm:f` children).
fn first_validation(sheet: &str) -> XmlResult<Option<SheetValidation>> {
    let mut found: Option<SheetValidation> = None;
    let mut current: Option<SheetValidation> = None;
    let mut field: Option<ValidationField> = None;
    walk(sheet, |node| {
        match node {
            Node::Open(element) if found.is_none() => match element.local_name().as_ref() {
                b"dataValidation" => {
                    current = Some(SheetValidation {
                        kind: attribute(element, "type")?.unwrap_or_default(),
                        range: attribute(element, "sqref")?.unwrap_or_default(),
                        formula: String::new(),
                    });
                }
                b"formula1" if current.is_some() => field = Some(ValidationField::Formula),
                b"sqref" if current.is_some() => field = Some(ValidationField::Range),
                _ => {}
            },
            Node::Text(text) => match (current.as_mut(), field) {
                (Some(validation), Some(ValidationField::Formula)) => {
                    validation.formula.push_str(text);
                }
                (Some(validation), Some(ValidationField::Range)) => {
                    validation.range.push_str(text);
                }
                _ => {}
            },
            Node::Close(b"formula1" | b"sqref") => field = None,
            Node::Close(b"dataValidation") => {
                if found.is_none() {
                    found = current.take();
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(found)
}

/// Every string of a shared-string table, rich-text runs joined and
/// phonetic hints dropped.
fn shared_strings(xml: &str) -> XmlResult<Vec<String>> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut phonetic = false;
    let mut capturing = false;
    walk(xml, |node| {
        match node {
            Node::Open(element) => match element.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic = true,
                b"t" => capturing = !phonetic,
                _ => {}
            },
            Node::Text(text) if capturing => {
                if let Some(value) = current.as_mut() {
                    value.push_str(text);
                }
            }
            Node::Close(b"t") => capturing = false,
            Node::Close(b"rPh") => phonetic = false,
            Node::Close(b"si") => strings.extend(current.take()),
            _ => {}
        }
        Ok(())
    })?;
    Ok(strings)
}

struct SheetCell {
    reference: String,
    shared: bool,
    text: String,
}

impl SheetCell {
    fn resolve(self, shared: &[String]) -> (String, String) {
        let value = if self.shared {
            self.text
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared.get(index).cloned())
                .unwrap_or_default()
        } else {
            self.text
        };
        (self.reference, value)
    }
}

/// `(reference, text)` for every cell in a worksheet, in document order.
fn cells(sheet: &str, shared: &[String]) -> XmlResult<Vec<(String, String)>> {
    let mut cells = Vec::new();
    let mut cell: Option<SheetCell> = None;
    let mut capturing = false;
    walk(sheet, |node| {
        match node {
            Node::Open(element) => match element.local_name().as_ref() {
                b"c" => {
                    cell = Some(SheetCell {
                        reference: attribute(element, "r")?.unwrap_or_default(),
                        shared: attribute(element, "t")?.as_deref() == Some("s"),
                        text: String::new(),
                    });
                }
                b"v" | b"t" => capturing = cell.is_some(),
                _ => {}
            },
            Node::Text(text) if capturing => {
                if let Some(cell) = cell.as_mut() {
                    cell.text.push_str(text);
                }
            }
            Node::Close(b"v" | b"t") => capturing = false,
            Node::Close(b"c") => {
                if let Some(cell) = cell.take() {
                    cells.push(cell.resolve(shared));
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(cells)
}

/// A single-column range such as `$A$1:$A$2`.
struct CellRange {
    column: String,
    first_row: u32,
    last_row: u32,
}

impl CellRange {
    fn parse(range: &str) -> Option<Self> {
        let cleaned = range.replace('$', "");
        let (start, end) = cleaned.split_once(':').unwrap_or((&cleaned, &cleaned));
        let (column, first_row) = split_reference(start)?;
        let (end_column, last_row) = split_reference(end)?;
        (column == end_column).then(|| Self {
            column,
            first_row,
            last_row,
        })
    }

    fn contains(&self, reference: &str) -> bool {
        split_reference(reference).is_some_and(|(column, row)| {
            column == self.column && (self.first_row..=self.last_row).contains(&row)
        })
    }
}

fn split_reference(reference: &str) -> Option<(String, u32)> {
    let digits_at = reference.find(|c: char| c.is_ascii_digit())?;
    let (column, row) = reference.split_at(digits_at);
    Some((column.to_owned(), row.parse().ok()?))
}

#[cfg(test)]
#[path = "spreadsheet_tests.rs"]
mod tests;
