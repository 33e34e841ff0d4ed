//! Error types for the tracker library.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{DecodeError, Role};

/// Comprehensive error type for all tracker operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Project not found for the given ID
    #[error("Project with ID {id} not found")]
    ProjectNotFound { id: String },
    /// Step not found (or not visible) for the given ID
    #[error("Step with ID {id} not found")]
    StepNotFound { id: String },
    /// Invite not found, already used, or expired
    #[error("Invite not found or no longer valid")]
    InviteNotFound,
    /// No acting user was configured
    #[error("Not authenticated: an acting user is required")]
    NotAuthenticated,
    /// The acting user's role does not allow the operation
    #[error("Permission denied: {action} is not allowed for role {role}")]
    PermissionDenied { action: String, role: String },
    /// A move would make a step its own ancestor
    #[error("Cannot move step {step} under {parent}: it would become its own ancestor")]
    Cycle { step: String, parent: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Backend rows or realtime payloads with an unexpected shape
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> TrackerError {
        TrackerError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> TrackerError {
        TrackerError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl TrackerError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Permission error for `action` attempted with `role` (or no membership).
    pub fn permission_denied(action: impl Into<String>, role: Option<Role>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            role: role.map_or_else(|| "none".to_string(), |r| r.as_str().to_string()),
        }
    }

    pub fn step_not_found(id: impl ToString) -> Self {
        Self::StepNotFound { id: id.to_string() }
    }

    pub fn project_not_found(id: impl ToString) -> Self {
        Self::ProjectNotFound { id: id.to_string() }
    }

    /// Whether the error came from the role check rather than the data.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. } | Self::NotAuthenticated)
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| TrackerError::database(message).with_source(e))
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
