use std::path::PathBuf;

use thiserror::Error;

/// Why the raw survey file could not be turned into a dataset.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("data file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType {
        column: String,
        data_type: arrow::datatypes::DataType,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// The stage at which a request ran out of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStage {
    /// No rows matched the filter selection.
    Filter,
    /// Rows matched, but none had every column the view needs.
    MissingValues,
}

/// Errors returned by the filter and aggregate engine.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("no data matches the current filters ({stage:?})")]
    Empty { stage: EmptyStage },

    #[error("'{0}' is not a supported {1} variable")]
    UnknownVariable(String, &'static str),

    #[error("'{0}' is not a five-point health scale")]
    NotAScale(String),

    #[error("unknown age group '{0}'")]
    UnknownAgeGroup(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
