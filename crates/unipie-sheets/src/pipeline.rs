//! Sequential file-by-file normalization.
//!
//! Files are processed one at a time: a file's University sheet must be
//! normalized before its other sheets because it supplies their anchor.
//! The first fatal error aborts the whole run.

use std::path::{Path, PathBuf};

use unipie_core::{AccumulatedTables, Entity, SourcesConfig};

use crate::error::SheetError;
use crate::loader::discover_workbooks;
use crate::normalize::{accumulate, normalize_workbook, WorkbookFragments};
use crate::workbook::Workbook;

/// Per-file outcome, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file_name: String,
    pub anchor: String,
    /// Fragment row counts in [`Entity::ALL`] order.
    pub rows: Vec<(Entity, usize)>,
}

impl FileSummary {
    fn from_fragments(fragments: &WorkbookFragments) -> Self {
        Self {
            file_name: fragments.file_name.clone(),
            anchor: fragments.anchor.clone(),
            rows: fragments.fragments.iter().map(|t| (t.entity, t.len())).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub tables: AccumulatedTables,
    pub files: Vec<FileSummary>,
}

/// Open and normalize a single workbook.
///
/// # Errors
///
/// Returns [`SheetError`] if the file cannot be read or its University
/// sheet cannot anchor the other sheets.
pub fn normalize_file(path: &Path, sources: &SourcesConfig) -> Result<WorkbookFragments, SheetError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut workbook = Workbook::open(path)?;
    let fragments = normalize_workbook(&mut workbook, &file_name, sources)?;
    tracing::info!(
        file = %file_name,
        anchor = %fragments.anchor,
        rows = fragments.fragments.iter().map(|t| t.len()).sum::<usize>(),
        "normalized workbook"
    );
    Ok(fragments)
}

/// Normalize `paths` in order and union their fragments.
///
/// # Errors
///
/// Returns the first [`SheetError`] encountered; no partial result is kept.
pub fn normalize_files(
    paths: &[PathBuf],
    sources: &SourcesConfig,
) -> Result<PipelineOutput, SheetError> {
    let mut workbooks = Vec::with_capacity(paths.len());
    for path in paths {
        workbooks.push(normalize_file(path, sources)?);
    }

    let files = workbooks.iter().map(FileSummary::from_fragments).collect();
    let tables = accumulate(workbooks)?;
    for table in tables.iter() {
        tracing::info!(table = %table.entity, rows = table.len(), "accumulated table");
    }
    Ok(PipelineOutput { tables, files })
}

/// Discover every workbook in `dir` and normalize them.
///
/// # Errors
///
/// Returns [`SheetError::MissingDirectory`] if `dir` is absent, or the
/// first error from [`normalize_files`].
pub fn normalize_directory(
    dir: &Path,
    sources: &SourcesConfig,
) -> Result<PipelineOutput, SheetError> {
    let paths = discover_workbooks(dir)?;
    if paths.is_empty() {
        tracing::warn!(dir = %dir.display(), "no workbooks found");
    }
    normalize_files(&paths, sources)
}
