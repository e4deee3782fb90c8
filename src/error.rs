//! Error types for the audit pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while connecting, aggregating or writing the report
#[derive(Debug, Error)]
pub enum AuditError {
    /// Credential file missing or malformed, signing failed, or access denied
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API answered with a non-success status or an unreadable body
    #[error("Tag Manager API error on {endpoint} ({status}): {message}")]
    RemoteApi {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// A key the aggregation cannot do without was absent from a response
    #[error("Missing field '{field}' in {context}")]
    MissingField { field: &'static str, context: String },

    /// Transport-level failure
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Output file could not be created, written or renamed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AuditError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error stems from the credential rather than the data
    pub fn is_authentication(&self) -> bool {
        matches!(self, AuditError::Authentication(_))
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
