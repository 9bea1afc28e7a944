//! In-memory blob store
//!
//! Keeps blobs in a map and counts calls, so tests can assert that
//! validation failures never reach storage.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{BlobStore, ProgressCallback, PublicUrls, fraction, validate_key};
use crate::error::BlobError;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub struct MemoryBlobStore {
    urls: PublicUrls,
    chunk_size: usize,
    blobs: RwLock<HashMap<String, Bytes>>,
    upload_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            urls: PublicUrls::new(public_base_url),
            chunk_size: DEFAULT_CHUNK_SIZE,
            blobs: RwLock::new(HashMap::new()),
            upload_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Make every following call fail with `BlobError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls that reached the store
    pub fn calls(&self) -> usize {
        self.upload_calls() + self.delete_calls()
    }

    pub async fn contains_url(&self, url: &str) -> bool {
        match self.urls.key_for(url) {
            Ok(key) => self.blobs.read().await.contains_key(&key),
            Err(_) => false,
        }
    }

    pub async fn content(&self, url: &str) -> Option<Bytes> {
        let key = self.urls.key_for(url).ok()?;
        self.blobs.read().await.get(&key).cloned()
    }

    fn check_available(&self) -> Result<(), BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BlobError::Unavailable("memory blob store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_blob(
        &self,
        content: Bytes,
        key: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String, BlobError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        validate_key(key)?;

        if let Some(report) = &progress {
            let total = content.len();
            let mut done = 0;
            while done < total {
                done = (done + self.chunk_size).min(total);
                report(fraction(done, total));
            }
            if total == 0 {
                report(1.0);
            }
        }

        debug!("stored {} bytes at {}", content.len(), key);
        self.blobs.write().await.insert(key.to_string(), content);
        Ok(self.urls.url_for(key))
    }

    async fn delete_blob(&self, url: &str) -> Result<(), BlobError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let key = self.urls.key_for(url)?;
        match self.blobs.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_one() {
        let store = MemoryBlobStore::new("mem://blobs").with_chunk_size(4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |f: f64| sink.lock().unwrap().push(f));

        store
            .upload_blob(Bytes::from_static(b"0123456789"), "k/a", Some(callback))
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![0.4, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() {
        let store = MemoryBlobStore::new("mem://blobs");
        let url = store
            .upload_blob(Bytes::from_static(b"x"), "k/a", None)
            .await
            .unwrap();
        store.delete_blob(&url).await.unwrap();
        assert!(matches!(store.delete_blob(&url).await, Err(BlobError::NotFound(_))));
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn offline_store_fails_with_unavailable() {
        let store = MemoryBlobStore::new("mem://blobs");
        store.set_unavailable(true);
        let err = store.upload_blob(Bytes::new(), "k/a", None).await.unwrap_err();
        assert!(matches!(err, BlobError::Unavailable(_)));
    }
}
