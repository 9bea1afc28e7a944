//! Error types
//!
//! Defines domain-specific error types for each layer of the file service.

use thiserror::Error;

/// Virtual path errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path must start with '/': {0}")]
    NotAbsolute(String),
    #[error("Path traversal attempt: {0}")]
    Traversal(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Cannot move a folder into itself: {0}")]
    MoveIntoSelf(String),
    #[error("Folder already exists: {0}")]
    AlreadyExists(String),
}

/// Client-side validation errors, raised before any backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("{name} has unsupported type {mime_type}")]
    UnsupportedType { name: String, mime_type: String },
    #[error("Too many files: {count} (limit {limit})")]
    TooManyFiles { count: usize, limit: usize },
    #[error("Empty file name")]
    EmptyName,
}

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed document {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Blob store errors
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("URL does not belong to this store: {0}")]
    ForeignUrl(String),
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
    #[error("Blob store unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Not signed in")]
    Unauthenticated,
    #[error("{principal} may not {operation} {resource}")]
    Forbidden {
        principal: String,
        operation: String,
        resource: String,
    },
    #[error("Field {0} may not be modified")]
    FieldNotWritable(String),
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),
}

/// General file service error that encompasses all error types
#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),
    #[error("Authorization error: {0}")]
    Policy(#[from] PolicyError),
}

pub type Result<T> = std::result::Result<T, FileServiceError>;
