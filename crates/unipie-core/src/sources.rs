//! Per-file source overrides.
//!
//! Some exports carry extra banner rows above the Programme sheet's header.
//! Instead of recognising those files by name in code, the index of that
//! header row is listed in a YAML file. Rows above it are skipped and the
//! header row itself is consumed:
//!
//! ```yaml
//! sources:
//!   - file: "Technical University of Munich.xlsx"
//!     programme_header_offset: 2
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOverride {
    pub file: String,
    #[serde(default)]
    pub programme_header_offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<SourceOverride>,
}

impl SourcesConfig {
    /// Zero-based index of the Programme sheet's header row; 0 when the
    /// sheet has no banner rows.
    ///
    /// Matched on the file name only; unknown files default to zero.
    #[must_use]
    pub fn programme_header_offset(&self, file_name: &str) -> usize {
        self.sources
            .iter()
            .find(|s| s.file == file_name)
            .map_or(0, |s| s.programme_header_offset)
    }
}

/// Load and validate the sources configuration.
///
/// A missing file is not an error: every file then uses the default layout.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no sources file; using default layouts");
        return Ok(SourcesConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sources(&content)
}

/// Parse and validate sources YAML.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or invalid entries.
pub fn parse_sources(content: &str) -> Result<SourcesConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(SourcesConfig::default());
    }
    let config: SourcesConfig =
        serde_yaml::from_str(content).map_err(ConfigError::SourcesFileParse)?;
    validate_sources(&config)?;
    Ok(config)
}

fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for source in &config.sources {
        if source.file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source file name must be non-empty".to_string(),
            ));
        }
        if source.file.contains('/') || source.file.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "source '{}' must be a bare file name, not a path",
                source.file
            )));
        }
        if !seen.insert(source.file.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source entry: '{}'",
                source.file
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_defaults_to_zero() {
        let config = SourcesConfig::default();
        assert_eq!(config.programme_header_offset("MIT.xlsx"), 0);
    }

    #[test]
    fn offset_is_looked_up_by_file_name() {
        let config = parse_sources(
            "sources:\n  - file: \"Technical University of Munich.xlsx\"\n    programme_header_offset: 3\n",
        )
        .unwrap();
        assert_eq!(
            config.programme_header_offset("Technical University of Munich.xlsx"),
            3
        );
        assert_eq!(config.programme_header_offset("MIT.xlsx"), 0);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_sources("  \n").unwrap(), SourcesConfig::default());
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let err = parse_sources(
            "sources:\n  - file: a.xlsx\n    programme_header_offset: 1\n  - file: a.xlsx\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn path_entries_are_rejected() {
        let err = parse_sources("sources:\n  - file: uni_data/a.xlsx\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse_sources("sources: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::SourcesFileParse(_)));
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_sources(&dir.path().join("absent.yaml")).unwrap();
        assert!(config.sources.is_empty());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(&path, "sources:\n  - file: b.xlsx\n    programme_header_offset: 2\n")
            .unwrap();
        let config = load_sources(&path).unwrap();
        assert_eq!(config.programme_header_offset("b.xlsx"), 2);
    }
}
