//! Error types for document and schema operations.

use loro::LoroError;
use thiserror::Error;

/// Errors raised by the document model.
///
/// Queries never fail because an id is missing. They only surface schema
/// errors for records that cannot be expanded at all.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("unknown object type code: {0:?}")]
    UnknownType(String),
    #[error("record {id} is missing required field `{field}`")]
    MissingField { id: String, field: &'static str },
    #[error("record {id} has a malformed `{field}` field")]
    MalformedField { id: String, field: &'static str },
    #[error("id already present in document: {0}")]
    DuplicateId(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("container {0} cannot be moved into its own subtree")]
    Cycle(String),
    #[error("CRDT error: {0}")]
    Loro(#[from] LoroError),
    #[error("snapshot export failed: {0}")]
    Export(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;
