//! Minimal `.xlsx` reader.
//!
//! An xlsx file is a zip archive of SpreadsheetML parts. Only the parts
//! needed to recover cell text are read: the workbook's sheet list, its
//! relationship targets, the shared string table and the worksheets
//! themselves. Cells are placed by their reference (`B7`) so sparse rows
//! keep their column positions.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use unipie_core::{normalize_header, Cell, Row};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::SheetError;

/// Maximum decompressed bytes read from a single archive entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Spreadsheet grid limits (Excel's own).
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Cell text of one worksheet as a row-major grid. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Row>,
}

impl RawSheet {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        let mut sheet = Self { rows };
        sheet.trim_trailing_blank_rows();
        sheet
    }

    /// Build a sheet from literal text; empty strings become blank cells.
    #[must_use]
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|v| clean_cell(v)).collect())
                .collect(),
        )
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    fn set(&mut self, row: usize, col: usize, value: Cell) {
        if value.is_none() {
            return;
        }
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = value;
    }

    fn trim_trailing_blank_rows(&mut self) {
        while self
            .rows
            .last()
            .is_some_and(|row| row.iter().all(Option::is_none))
        {
            self.rows.pop();
        }
    }
}

/// Trim a cell's text, mapping blank text to `None`.
#[must_use]
pub fn clean_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    part: String,
}

/// An opened xlsx workbook.
pub struct Workbook {
    path: String,
    archive: ZipArchive<Cursor<Vec<u8>>>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("path", &self.path)
            .field("sheets", &self.sheet_names())
            .field("shared_strings", &self.shared_strings.len())
            .finish_non_exhaustive()
    }
}

impl Workbook {
    /// Open an xlsx file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Io`] if the file cannot be read, or the errors
    /// of [`Workbook::from_bytes`].
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let bytes = std::fs::read(path).map_err(|e| SheetError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(path.display().to_string(), bytes)
    }

    /// Open an xlsx workbook held in memory. `label` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Zip`] if the bytes are not a zip archive and
    /// [`SheetError::Malformed`] if the workbook parts cannot be parsed.
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SheetError> {
        let path = label.into();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| SheetError::Zip {
            path: path.clone(),
            source: e,
        })?;

        let workbook_xml = read_entry(&mut archive, &path, WORKBOOK_PART)?.ok_or_else(|| {
            SheetError::Malformed {
                path: path.clone(),
                part: WORKBOOK_PART.to_string(),
                reason: "part is missing".to_string(),
            }
        })?;
        let declared = parse_workbook_sheets(&workbook_xml)
            .map_err(|reason| malformed(&path, WORKBOOK_PART, reason))?;

        let rels = match read_entry(&mut archive, &path, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)
                .map_err(|reason| malformed(&path, WORKBOOK_RELS_PART, reason))?,
            None => Vec::new(),
        };

        let sheets = declared
            .into_iter()
            .enumerate()
            .map(|(idx, (name, rel_id))| {
                let part = rels
                    .iter()
                    .find(|(id, _)| *id == rel_id)
                    .map_or_else(
                        || format!("xl/worksheets/sheet{}.xml", idx + 1),
                        |(_, target)| resolve_target(target),
                    );
                SheetEntry { name, part }
            })
            .collect();

        let shared_strings = match read_entry(&mut archive, &path, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)
                .map_err(|reason| malformed(&path, SHARED_STRINGS_PART, reason))?,
            None => Vec::new(),
        };

        Ok(Self {
            path,
            archive,
            sheets,
            shared_strings,
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Read a worksheet by name.
    ///
    /// An exact name match wins; otherwise names are compared after header
    /// normalization, so `Programme Description` finds `ProgrammeDescription`.
    /// Returns `Ok(None)` when the workbook has no such sheet.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Malformed`] if the sheet part is missing or its
    /// XML cannot be parsed.
    pub fn sheet(&mut self, name: &str) -> Result<Option<RawSheet>, SheetError> {
        let wanted = normalize_header(name);
        let Some(entry) = self
            .sheets
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.sheets.iter().find(|s| normalize_header(&s.name) == wanted))
            .cloned()
        else {
            return Ok(None);
        };

        let xml = read_entry(&mut self.archive, &self.path, &entry.part)?.ok_or_else(|| {
            SheetError::Malformed {
                path: self.path.clone(),
                part: entry.part.clone(),
                reason: format!("worksheet part for sheet '{}' is missing", entry.name),
            }
        })?;

        parse_worksheet(&xml, &self.shared_strings)
            .map(Some)
            .map_err(|reason| malformed(&self.path, &entry.part, reason))
    }
}

fn malformed(path: &str, part: &str, reason: String) -> SheetError {
    SheetError::Malformed {
        path: path.to_string(),
        part: part.to_string(),
        reason,
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    path: &str,
    name: &str,
) -> Result<Option<Vec<u8>>, SheetError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(SheetError::Zip {
                path: path.to_string(),
                source: e,
            })
        }
    };

    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| SheetError::Io {
            path: format!("{path}:{name}"),
            source: e,
        })?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(malformed(
            path,
            name,
            format!("entry exceeds size limit ({MAX_ENTRY_BYTES} bytes)"),
        ));
    }
    Ok(Some(out))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, String> {
    for a in e.attributes() {
        let a = a.map_err(|err| err.to_string())?;
        if a.key.local_name().as_ref() == local {
            let value = a.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?.ok_or("sheet element without name")?;
                let rel_id = attr(&e, b"id")?.unwrap_or_default();
                sheets.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// `(relationship id, target)` pairs.
fn parse_relationships(xml: &[u8]) -> Result<Vec<(String, String)>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    rels.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Phonetic runs (<rPh>) repeat the text as a reading guide; skip them.
    let mut phonetic_depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = phonetic_depth == 0,
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Event::CData(c) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Split a reference such as `AB12` into zero-based `(row, column)`.
fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .filter(|&i| i > 0)?;
    let (letters, digits) = reference.split_at(split);
    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = usize::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    value: String,
}

fn resolve_cell(cell: PendingCell, shared: &[String]) -> Result<Cell, String> {
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let idx = cell
                .value
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("bad shared string index '{}': {e}", cell.value))?;
            shared
                .get(idx)
                .cloned()
                .ok_or_else(|| format!("shared string index {idx} out of range"))?
        }
        Some("b") => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        // Error cells (#N/A, #REF!) carry no data.
        Some("e") => return Ok(None),
        _ => cell.value,
    };
    Ok(clean_cell(&value))
}

fn parse_worksheet(xml: &[u8], shared: &[String]) -> Result<RawSheet, String> {
    let mut reader = Reader::from_reader(xml);
    let mut sheet = RawSheet::default();
    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_col = 0usize;
    let mut pending: Option<PendingCell> = None;
    let mut capture = false;
    let mut in_inline = false;

    let start_row = |e: &BytesStart<'_>, next_row: usize| -> Result<usize, String> {
        let row = match attr(e, b"r")? {
            Some(r) => r
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&r| r > 0)
                .map(|r| r - 1)
                .ok_or_else(|| format!("bad row number '{r}'"))?,
            None => next_row,
        };
        if row >= MAX_ROWS {
            return Err(format!("row {} exceeds sheet limits", row + 1));
        }
        Ok(row)
    };

    let start_cell = |e: &BytesStart<'_>,
                      current_row: usize,
                      next_col: usize|
     -> Result<PendingCell, String> {
        let (row, col) = match attr(e, b"r")? {
            Some(r) => parse_cell_ref(&r).ok_or_else(|| format!("bad cell reference '{r}'"))?,
            None => (current_row, next_col),
        };
        if row >= MAX_ROWS || col >= MAX_COLUMNS {
            return Err(format!("cell ({row}, {col}) exceeds sheet limits"));
        }
        Ok(PendingCell {
            row,
            col,
            kind: attr(e, b"t")?,
            value: String::new(),
        })
    };

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = start_row(&e, next_row)?;
                    next_row = current_row + 1;
                    next_col = 0;
                }
                b"c" => {
                    let cell = start_cell(&e, current_row, next_col)?;
                    next_col = cell.col + 1;
                    pending = Some(cell);
                }
                b"v" => capture = pending.is_some(),
                b"is" => in_inline = true,
                b"t" if in_inline => capture = pending.is_some(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = start_row(&e, next_row)?;
                    next_row = current_row + 1;
                    next_col = 0;
                }
                b"c" => {
                    let cell = start_cell(&e, current_row, next_col)?;
                    next_col = cell.col + 1;
                }
                _ => {}
            },
            Event::Text(t) if capture => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(cell) = pending.as_mut() {
                    cell.value.push_str(&text);
                }
            }
            Event::CData(c) if capture => {
                if let Some(cell) = pending.as_mut() {
                    cell.value.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"is" => in_inline = false,
                b"c" => {
                    if let Some(cell) = pending.take() {
                        let (row, col) = (cell.row, cell.col);
                        let value = resolve_cell(cell, shared)?;
                        sheet.set(row, col, value);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    sheet.trim_trailing_blank_rows();
    Ok(sheet)
}
