pub mod error;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod workbook;

pub use error::SheetError;
pub use loader::discover_workbooks;
pub use normalize::{
    accumulate, normalize_programme, normalize_records, normalize_university, normalize_workbook,
    UniversityFragment, WorkbookFragments,
};
pub use pipeline::{normalize_directory, normalize_file, normalize_files, FileSummary, PipelineOutput};
pub use workbook::{RawSheet, Workbook};
