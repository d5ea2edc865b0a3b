//! Discovery of input workbooks.

use std::path::{Path, PathBuf};

use crate::error::SheetError;

/// File extension of the spreadsheet exports.
pub const WORKBOOK_EXTENSION: &str = "xlsx";

/// List the `.xlsx` files directly inside `dir`, sorted by path.
///
/// Subdirectories are not searched. Office lock files (`~$name.xlsx`) are
/// skipped. An empty directory yields an empty list.
///
/// # Errors
///
/// Returns [`SheetError::MissingDirectory`] if `dir` does not exist or is
/// not a directory, and [`SheetError::Io`] if it cannot be listed.
pub fn discover_workbooks(dir: &Path) -> Result<Vec<PathBuf>, SheetError> {
    if !dir.is_dir() {
        return Err(SheetError::MissingDirectory {
            path: dir.display().to_string(),
        });
    }

    let io_err = |e: std::io::Error| SheetError::Io {
        path: dir.display().to_string(),
        source: e,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_file() || !is_workbook(&path) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    tracing::debug!(dir = %dir.display(), count = paths.len(), "discovered workbooks");
    Ok(paths)
}

fn is_workbook(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(WORKBOOK_EXTENSION));
    let is_lock_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"));
    has_extension && !is_lock_file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_top_level_xlsx_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLSX", "notes.csv", "~$a.xlsx", "legacy.xls"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.xlsx"), b"").unwrap();

        let found = discover_workbooks(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b.xlsx"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_workbooks(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_workbooks(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, SheetError::MissingDirectory { .. }));
    }

    #[test]
    fn a_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.xlsx");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            discover_workbooks(&file),
            Err(SheetError::MissingDirectory { .. })
        ));
    }
}
