//! Unified error type for store, context and file operations.
//!
//! # Responsibility
//! - Give every facade operation one `StoreResult<T>` return shape.
//! - Keep commit failures distinguishable from query failures.
//!
//! # Invariants
//! - No store operation terminates the process on failure.
//! - Store-file deletion reports `DirectoryNotFound` / `FileDoesNotExist`
//!   separately from underlying filesystem errors.

use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or statement failure reported by SQLite.
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Saving pending changes failed; the context was rolled back.
    #[error("failed to commit pending changes: {0}")]
    Commit(#[source] rusqlite::Error),

    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },

    /// Persisted entity layout differs from the registered descriptor.
    #[error("record type `{record_type}` is stored as `{stored}` but declared as `{declared}`")]
    SchemaMismatch {
        record_type: String,
        stored: String,
        declared: String,
    },

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("record type `{record_type}` has no attribute `{attribute}`")]
    UnknownAttribute {
        record_type: &'static str,
        attribute: &'static str,
    },

    #[error("record type `{0}` is not registered with this store")]
    UnregisteredRecordType(&'static str),

    #[error("invalid persisted record data: {0}")]
    InvalidData(String),

    #[error("application support directory not found")]
    DirectoryNotFound,

    #[error("store file does not exist: {}", .0.display())]
    FileDoesNotExist(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background context worker panicked")]
    BackgroundPanicked,
}

impl StoreError {
    /// Stable short code used in structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Commit(_) => "commit_failed",
            Self::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::UnknownAttribute { .. } => "unknown_attribute",
            Self::UnregisteredRecordType(_) => "unregistered_record_type",
            Self::InvalidData(_) => "invalid_data",
            Self::DirectoryNotFound => "directory_not_found",
            Self::FileDoesNotExist(_) => "file_does_not_exist",
            Self::Io(_) => "io",
            Self::BackgroundPanicked => "background_panicked",
        }
    }
}
