//! Common types and errors for Folio
//!
//! This crate provides the error taxonomy shared by every Folio component,
//! plus logging setup and log redaction helpers.

pub mod sanitizer;
pub mod telemetry;

use thiserror::Error;

/// Core error types for Folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    /// Unknown document key. `known` lists the keys currently registered.
    #[error("{what} is not found. Existing document-keys are: {}", .known.join(", "))]
    NotFound { what: String, known: Vec<String> },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Bad anchor: {0}")]
    BadAnchor(String),

    #[error("Wrong item kind: {0}")]
    WrongKind(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    /// Search before any document was exported to the passage index
    #[error("No document has been indexed yet. Export a document to the vector db before searching.")]
    EmptyIndex,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FolioError {
    /// Not-found error for a document key, listing the keys that do exist
    pub fn unknown_document(key: &str, known: Vec<String>) -> Self {
        FolioError::NotFound {
            what: format!("document-key: {}", key),
            known,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FolioError>;
