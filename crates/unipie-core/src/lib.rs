pub mod app_config;
pub mod config;
pub mod headers;
pub mod schema;
pub mod sources;
pub mod table;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use headers::{is_header_echo, match_header, normalize_header};
pub use schema::{Column, ColumnType, Entity, ForeignKey, TableSchema, PROGRAMME_NAME, UNI_NAME};
pub use sources::{load_sources, SourceOverride, SourcesConfig};
pub use table::{AccumulatedTables, Accumulator, Cell, Row, Table};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[source] serde_yaml::Error),

    #[error("invalid sources configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("fragment for {entity} has non-canonical columns: [{columns}]")]
    ColumnMismatch { entity: String, columns: String },
}
