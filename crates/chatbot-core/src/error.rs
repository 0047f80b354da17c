//! Error types for the chatbot store.

use thiserror::Error;

/// Result type alias using ChatbotError.
pub type Result<T> = std::result::Result<T, ChatbotError>;

/// Errors that can occur in the chatbot store.
#[derive(Error, Debug)]
pub enum ChatbotError {
    /// A row with the same primary key already exists.
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: String, key: String },

    /// A foreign key points at a row that does not exist.
    #[error("Missing reference in {table}: {reason}")]
    MissingReference { table: String, reason: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Entity name that is not part of the schema.
    #[error("Unknown entity: {name}")]
    UnknownEntity { name: String },

    /// Connection scheme the store cannot open.
    #[error("Unsupported connection scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ChatbotError {
    /// Create a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a missing reference error.
    pub fn missing_reference(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingReference {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for the rejections a constraint produces (duplicate or dangling key).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. } | Self::MissingReference { .. })
    }

    /// Get a stable error code for programmatic callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::MissingReference { .. } => "MISSING_REFERENCE",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::UnknownEntity { .. } => "UNKNOWN_ENTITY",
            Self::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
