//! Error handlers
//!
//! Logs errors and turns them into messages the UI layer can show as-is.

use crate::error::types::{BlobError, FileServiceError, PolicyError, StoreError};
use log::error;

/// Log a file service error
pub fn handle_error(err: &FileServiceError) {
    error!("File service error: {}", err);
}

/// Short, user-facing description of an error
pub fn user_message(err: &FileServiceError) -> String {
    match err {
        FileServiceError::Path(e) => format!("Invalid location: {e}"),
        FileServiceError::Validation(e) => e.to_string(),
        FileServiceError::Store(StoreError::NotFound { .. }) => {
            "The item no longer exists".to_string()
        }
        FileServiceError::Store(StoreError::PermissionDenied(_)) => {
            "You do not have access to this item".to_string()
        }
        FileServiceError::Store(_) => "Could not reach the file service, try again".to_string(),
        FileServiceError::Blob(BlobError::NotFound(_)) => "The file no longer exists".to_string(),
        FileServiceError::Blob(_) => "File transfer failed, try again".to_string(),
        FileServiceError::Policy(PolicyError::RateLimited(_)) => {
            "Too many requests, slow down".to_string()
        }
        FileServiceError::Policy(PolicyError::Unauthenticated) => {
            "Sign in to continue".to_string()
        }
        FileServiceError::Policy(_) => "You do not have access to this item".to_string(),
    }
}
