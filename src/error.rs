//! Error types for the customer-desk library.
//!
//! This module provides custom error types using `thiserror` so callers can tell
//! fatal import failures apart from the recoverable row and script errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the customer-desk application.
#[derive(Error, Debug)]
pub enum DeskError {
    /// The source spreadsheet is missing, corrupt or in an unsupported format
    #[error("Failed to read spreadsheet {path}: {reason}")]
    FileRead {
        /// Path that was being read
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// A single row could not be coerced or inserted
    #[error("Failed to insert row {row} into {table}: {reason}")]
    RowInsert {
        /// Derived table name
        table: String,
        /// Zero-based data row index within the sheet
        row: usize,
        /// Underlying reason
        reason: String,
    },

    /// The SQL script could not be written
    #[error("Failed to generate SQL script {path}: {reason}")]
    ScriptGeneration {
        /// Output path of the script
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Sentiment classification failed (absorbed by the classifier)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input rejected by validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Contact not found
    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// An operation that needs a database was called on a session without one
    #[error("No database attached to the import session")]
    NoDatabase,

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `DeskError`
pub type Result<T> = std::result::Result<T, DeskError>;

impl From<anyhow::Error> for DeskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl DeskError {
    /// True for errors that abort a whole import
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::FileRead { .. } | Self::NoDatabase)
    }
}
