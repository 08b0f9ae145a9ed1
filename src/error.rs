use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("wrong filter file format at line {line}: {content}")]
    FilterFormat { line: usize, content: String },

    #[error("unknown filter field: {0}")]
    UnknownFilterField(String),

    #[error("no value given for filter field {0}")]
    EmptyFilterValue(String),

    #[error("the value of \"{field}\" should be one of {expected}, not {value}")]
    InvalidFilterValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("unknown omics type: {0}")]
    UnknownOmicsType(String),

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error(
        "sample_type_id, sample_types_for_*, omics_types_for_cases_intersection and keep_samples_from_same_case only work on {prefix} projects, not {project}"
    )]
    IneligibleProject { project: String, prefix: String },

    #[error("invalid dimension order: {0}")]
    InvalidDimOrder(String),

    #[error("empty table")]
    EmptyTable,

    #[error("different row length: row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column index {index} out of range for row {row}")]
    ColumnIndex { row: usize, index: usize },

    #[error("duplicate key in table: {0}")]
    DuplicateKey(String),

    #[error("repeated aliquot barcode {barcode} (aliquot {aliquot})")]
    DuplicateBarcode { aliquot: String, barcode: String },

    #[error("more than 1 omics type detected: {0}")]
    AmbiguousOmicsType(String),

    #[error("no omics type could be detected from the answer")]
    UndetectedOmicsType,

    #[error("value column {column} not found for omics type {omics}")]
    MissingValueColumn { omics: String, column: String },

    #[error("different header line across mutation files: {0}")]
    HeaderMismatch(String),

    #[error("unsuitable omics type for {operation}: {omics}")]
    UnsupportedOmicsType { omics: String, operation: String },

    #[error("unexpected source file name: {0}")]
    SourceFileName(String),

    #[error("GDC request failed: {0}")]
    CatalogHttp(String),

    #[error("GDC returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("GDC returned warnings: {0}")]
    CatalogWarnings(String),

    #[error("malformed catalog answer: {0}")]
    MalformedAnswer(String),

    #[error("data file not found for file id: {0}")]
    MissingDataFile(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
