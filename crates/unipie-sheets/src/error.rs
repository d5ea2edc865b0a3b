use thiserror::Error;
use unipie_core::CoreError;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("input directory {path} does not exist or is not a directory")]
    MissingDirectory { path: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a readable xlsx archive: {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("malformed workbook {path} ({part}): {reason}")]
    Malformed {
        path: String,
        part: String,
        reason: String,
    },

    #[error("{path} has no University sheet; cannot establish the university for its other sheets")]
    MissingUniversitySheet { path: String },

    #[error("University sheet in {path} has no uni_name value")]
    MissingAnchor { path: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
