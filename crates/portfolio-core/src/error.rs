use std::path::PathBuf;
use thiserror::Error;

use crate::schema::TableKind;

/// All errors produced by the portfolio report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// An input file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the structure of a source.
    #[error("Malformed {table} table: {source}")]
    Csv {
        table: TableKind,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from a source's header row.
    #[error("Missing required column \"{column}\" in {table} table")]
    MissingColumn { table: TableKind, column: String },

    /// The same event identifier appears on more than one row.
    #[error("Duplicate event identifier \"{id}\" on rows {first_row} and {second_row}")]
    DuplicateEventId {
        id: String,
        first_row: usize,
        second_row: usize,
    },

    /// The selected client is not one of the clients in the event table.
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Writing an export document failed.
    #[error("Export failed for {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// `true` for errors caused by the shape of the inputs rather than their
    /// values: unreadable sources and missing columns.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReportError::FileRead { .. } | ReportError::Csv { .. } | ReportError::MissingColumn { .. }
        )
    }

    /// `true` for data-quality problems that would silently corrupt the join.
    pub fn is_data_quality(&self) -> bool {
        matches!(self, ReportError::DuplicateEventId { .. })
    }
}

/// Convenience alias used throughout the portfolio crates.
pub type Result<T> = std::result::Result<T, ReportError>;
