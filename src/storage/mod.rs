//! Blob storage adapter
//!
//! Uploads binary content and hands back a public retrieval URL; deletes
//! content by URL. A missing blob is reported as `BlobError::NotFound` so
//! callers can treat deletes as idempotent.

pub mod filesystem;
pub mod keys;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::BlobError;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

/// Receives upload progress as a completion fraction in `[0, 1]`
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `content` under `key` and return its retrieval URL
    async fn upload_blob(
        &self,
        content: Bytes,
        key: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String, BlobError>;

    /// Remove the content behind `url`
    async fn delete_blob(&self, url: &str) -> Result<(), BlobError>;
}

/// Maps blob keys to public URLs and back
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base: String,
}

impl PublicUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base, key)
    }

    pub fn key_for(&self, url: &str) -> Result<String, BlobError> {
        url.strip_prefix(&self.base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(String::from)
            .ok_or_else(|| BlobError::ForeignUrl(url.to_string()))
    }
}

/// Reject keys that could escape the store's namespace
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() || key.starts_with('/') || key.contains("..") || key.contains('\0') {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Completion fraction after `done` of `total` bytes
pub(crate) fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}
