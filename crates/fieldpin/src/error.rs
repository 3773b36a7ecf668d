//! Error types for fieldpin.
//!
//! This module defines all error types used throughout the fieldpin crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::field::FieldId;

/// The main error type for fieldpin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Engine Errors ===
    /// A field operation referenced a field that is not selected.
    #[error("field {id} is not selected")]
    FieldNotSelected {
        /// The field that was referenced.
        id: FieldId,
    },

    /// A field operation addressed a position outside the selected list.
    #[error("field index {index} out of range for {len} selected fields")]
    FieldIndex {
        /// The requested index.
        index: usize,
        /// Number of selected fields.
        len: usize,
    },

    /// A pin key did not follow the `customFields_selected` / `customField_<id>` convention.
    #[error("invalid pin key: {key}")]
    InvalidPinKey {
        /// The offending key.
        key: String,
    },

    /// A legacy pin value could not be interpreted.
    #[error("invalid pin value for '{key}': {message}")]
    InvalidPinValue {
        /// Key of the offending entry.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The session was closed while an operation was in flight.
    #[error("session closed")]
    SessionClosed,

    // === Collaborator Errors ===
    /// Creating a catalog field failed.
    #[error("failed to create field '{name}': {message}")]
    FieldCreation {
        /// Requested field name.
        name: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A value-suggestion lookup failed.
    #[error("suggestion lookup failed: {0}")]
    Lookup(String),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fieldpin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new lookup error.
    #[must_use]
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    /// Create a field creation error.
    #[must_use]
    pub fn field_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid pin value error.
    #[must_use]
    pub fn invalid_pin_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPinValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if this error indicates the session was closed.
    #[must_use]
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Self::SessionClosed)
    }
}
