//! Sheet-to-table normalization.
//!
//! Each source workbook describes one university. Its University sheet is a
//! two-column (field, value) list; every other sheet is one record per row.
//! Normalization maps both layouts onto the canonical columns, drops rows
//! that are noise (blank keys, restated headers, incomplete programmes) and
//! stamps child rows with the university name found on the University sheet
//! (the file's anchor).

use unipie_core::{
    is_header_echo, match_header, AccumulatedTables, Accumulator, Cell, Entity, Row,
    SourcesConfig, Table, PROGRAMME_NAME, UNI_NAME,
};

use crate::error::SheetError;
use crate::workbook::{RawSheet, Workbook};

const DEGREE_AWARDED: &str = "degree_awarded";

/// University fragment plus the anchor name it establishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversityFragment {
    pub anchor: String,
    pub table: Table,
}

/// Every fragment normalized from one workbook, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookFragments {
    pub file_name: String,
    pub anchor: String,
    pub fragments: Vec<Table>,
}

impl WorkbookFragments {
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&Table> {
        self.fragments.iter().find(|t| t.entity == entity)
    }
}

/// Normalize a University sheet laid out as (field name, value) rows.
///
/// Field names are matched against the canonical headers ignoring case and
/// separators; unknown fields are dropped and the first occurrence of a
/// repeated field wins.
///
/// # Errors
///
/// Returns [`SheetError::MissingAnchor`] when no `uni_name` value is present.
pub fn normalize_university(sheet: &RawSheet, path: &str) -> Result<UniversityFragment, SheetError> {
    let headers = Entity::University.sheet_headers();
    let mut table = Table::empty(Entity::University);
    let mut row: Row = vec![None; table.columns.len()];
    let mut filled = vec![false; row.len()];

    for source in sheet.rows() {
        let Some(field) = source.first().and_then(Option::as_deref) else {
            continue;
        };
        let Some(canonical) = match_header(field, &headers) else {
            tracing::debug!(path, field, "dropping unmatched University field");
            continue;
        };
        let Some(idx) = table.column_index(canonical) else {
            continue;
        };
        if filled[idx] {
            continue;
        }
        filled[idx] = true;
        row[idx] = source.get(1).cloned().flatten();
    }

    let anchor = table
        .column_index(UNI_NAME)
        .and_then(|idx| row[idx].clone())
        .ok_or_else(|| SheetError::MissingAnchor {
            path: path.to_string(),
        })?;

    table.push_row(row);
    Ok(UniversityFragment { anchor, table })
}

/// Normalize a Programme sheet.
///
/// A non-zero `header_offset` is the index of the sheet's header row: the
/// rows above it are skipped and the header row itself is always consumed,
/// whatever its spelling. With no offset the header row is optional.
/// Rows whose `programme_name` is blank or restates a header, and rows
/// without a `degree_awarded`, are dropped. Surviving rows are stamped
/// with `anchor`.
#[must_use]
pub fn normalize_programme(sheet: &RawSheet, anchor: &str, header_offset: usize) -> Table {
    let entity = Entity::Programme;
    let headers = entity.sheet_headers();
    let rows = non_blank_rows(sheet.rows().iter().skip(header_offset));
    let (layout, body) = if header_offset > 0 {
        ColumnLayout::consume_header(entity, &rows)
    } else {
        ColumnLayout::detect(entity, &rows)
    };

    let mut table = Table::empty(entity);
    let mut dropped = 0usize;
    for source in body {
        let record = layout.project(source);
        let keep = record.value(DEGREE_AWARDED).is_some()
            && record
                .value(PROGRAMME_NAME)
                .is_some_and(|key| !is_header_echo(key, &headers));
        if keep {
            table.push_row(record.into_row(anchor));
        } else {
            dropped += 1;
        }
    }

    tracing::debug!(anchor, kept = table.len(), dropped, "normalized Programme sheet");
    table
}

/// Normalize a row-per-record sheet (ProgrammeDescription,
/// CourseDescription, TestType).
///
/// The `programme_name` column is forward-filled to repair merged cells
/// before rows with a blank or header-echo key are dropped. Exact duplicate
/// rows collapse to one.
#[must_use]
pub fn normalize_records(entity: Entity, sheet: &RawSheet, anchor: &str) -> Table {
    let headers = entity.sheet_headers();
    let rows = non_blank_rows(sheet.rows().iter());
    let (layout, body) = ColumnLayout::detect(entity, &rows);

    let mut table = Table::empty(entity);
    let mut dropped = 0usize;
    let mut last_key: Cell = None;
    for source in body {
        let mut record = layout.project(source);
        if let Some(key) = record.value(entity.key_column()) {
            last_key = Some(key.to_string());
        } else {
            record.set(entity.key_column(), last_key.clone());
        }

        let keep = record
            .value(entity.key_column())
            .is_some_and(|key| !is_header_echo(key, &headers));
        if keep {
            table.push_row(record.into_row(anchor));
        } else {
            dropped += 1;
        }
    }

    let before = table.len();
    table.dedup();
    tracing::debug!(
        anchor,
        entity = %entity,
        kept = table.len(),
        dropped,
        duplicates = before - table.len(),
        "normalized record sheet"
    );
    table
}

/// Normalize all five sheets of one workbook.
///
/// The University sheet is read first because its `uni_name` anchors every
/// other sheet in the file. Any other sheet that is absent yields an empty
/// fragment.
///
/// # Errors
///
/// Returns [`SheetError::MissingUniversitySheet`] or
/// [`SheetError::MissingAnchor`] when the anchor cannot be established, and
/// [`SheetError::Malformed`] when a present sheet cannot be parsed.
pub fn normalize_workbook(
    workbook: &mut Workbook,
    file_name: &str,
    sources: &SourcesConfig,
) -> Result<WorkbookFragments, SheetError> {
    let path = workbook.path().to_string();
    let university_sheet = workbook
        .sheet(Entity::University.table_name())?
        .ok_or_else(|| SheetError::MissingUniversitySheet { path: path.clone() })?;
    let UniversityFragment { anchor, table } = normalize_university(&university_sheet, &path)?;

    let mut fragments = vec![table];
    for entity in &Entity::ALL[1..] {
        let Some(sheet) = workbook.sheet(entity.table_name())? else {
            tracing::warn!(path = %path, entity = %entity, "sheet missing; using empty fragment");
            fragments.push(Table::empty(*entity));
            continue;
        };
        let fragment = match entity {
            Entity::Programme => normalize_programme(
                &sheet,
                &anchor,
                sources.programme_header_offset(file_name),
            ),
            _ => normalize_records(*entity, &sheet, &anchor),
        };
        fragments.push(fragment);
    }

    Ok(WorkbookFragments {
        file_name: file_name.to_string(),
        anchor,
        fragments,
    })
}

/// Fold every file's fragments into one table per entity.
///
/// # Errors
///
/// Returns the first [`SheetError`] from [`unipie_core::Accumulator::absorb`].
pub fn accumulate<I>(workbooks: I) -> Result<AccumulatedTables, SheetError>
where
    I: IntoIterator<Item = WorkbookFragments>,
{
    let mut accumulator = Accumulator::new();
    for workbook in workbooks {
        for fragment in workbook.fragments {
            accumulator.absorb(fragment)?;
        }
    }
    Ok(accumulator.finish())
}

fn non_blank_rows<'a, I>(rows: I) -> Vec<&'a Row>
where
    I: Iterator<Item = &'a Row>,
{
    rows.filter(|row| row.iter().any(Option::is_some)).collect()
}

/// Where each canonical sheet header is read from in a source row.
#[derive(Debug)]
struct ColumnLayout {
    headers: Vec<&'static str>,
    sources: Vec<Option<usize>>,
}

impl ColumnLayout {
    /// Decide how source columns map onto canonical headers.
    ///
    /// When the first row is a header row (one of its cells names the key
    /// column) columns are mapped by name, cells naming no canonical header
    /// are dropped, and that row is consumed. Otherwise columns map by
    /// position.
    fn detect<'r>(entity: Entity, rows: &'r [&'r Row]) -> (Self, &'r [&'r Row]) {
        let headers = entity.sheet_headers();
        if let Some(first) = rows.first() {
            if let Some(layout) = Self::from_header_row(entity, &headers, first) {
                return (layout, &rows[1..]);
            }
        }
        (Self::positional(headers), rows)
    }

    /// Treat the first row as the header unconditionally. Columns are mapped
    /// by name when the row names the key column, otherwise by position.
    fn consume_header<'r>(entity: Entity, rows: &'r [&'r Row]) -> (Self, &'r [&'r Row]) {
        let headers = entity.sheet_headers();
        let Some((first, body)) = rows.split_first() else {
            return (Self::positional(headers), rows);
        };
        let layout = Self::from_header_row(entity, &headers, first)
            .unwrap_or_else(|| Self::positional(headers));
        (layout, body)
    }

    fn positional(headers: Vec<&'static str>) -> Self {
        let sources = (0..headers.len()).map(Some).collect();
        Self { headers, sources }
    }

    fn from_header_row(entity: Entity, headers: &[&'static str], row: &Row) -> Option<Self> {
        let mut sources = vec![None; headers.len()];
        for (col, cell) in row.iter().enumerate() {
            let Some(text) = cell.as_deref() else {
                continue;
            };
            let Some(canonical) = match_header(text, headers) else {
                continue;
            };
            if let Some(idx) = headers.iter().position(|h| *h == canonical) {
                if sources[idx].is_none() {
                    sources[idx] = Some(col);
                }
            }
        }
        let key_idx = headers.iter().position(|h| *h == entity.key_column())?;
        sources[key_idx]?;
        Some(Self {
            headers: headers.to_vec(),
            sources,
        })
    }

    fn project(&self, row: &Row) -> Record<'_> {
        let values = self
            .sources
            .iter()
            .map(|src| src.and_then(|col| row.get(col).cloned().flatten()))
            .collect();
        Record {
            headers: &self.headers,
            values,
        }
    }
}

/// One source row projected onto canonical sheet headers.
struct Record<'a> {
    headers: &'a [&'static str],
    values: Vec<Cell>,
}

impl Record<'_> {
    fn position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| *h == column)
    }

    fn value(&self, column: &str) -> Option<&str> {
        self.values.get(self.position(column)?)?.as_deref()
    }

    fn set(&mut self, column: &str, value: Cell) {
        if let Some(idx) = self.position(column) {
            self.values[idx] = value;
        }
    }

    /// Prefix the anchor so the row lines up with the table's columns.
    fn into_row(self, anchor: &str) -> Row {
        let mut row = Vec::with_capacity(self.values.len() + 1);
        row.push(Some(anchor.to_string()));
        row.extend(self.values);
        row
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
