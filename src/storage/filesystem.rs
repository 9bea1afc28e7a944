//! Filesystem blob store
//!
//! Stores blobs under a root directory. Uploads are written to a temporary
//! `.part` file and renamed into place once complete.

use async_trait::async_trait;
use bytes::Bytes;
use log::{error, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{BlobStore, ProgressCallback, PublicUrls, fraction, validate_key};
use crate::config::StorageSettings;
use crate::error::BlobError;

pub struct FilesystemBlobStore {
    root: PathBuf,
    urls: PublicUrls,
    chunk_size: usize,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            urls: PublicUrls::new(public_base_url),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(
            settings.blob_root_path(),
            &settings.public_base_url,
            settings.upload_chunk_size,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    async fn write_chunks(
        &self,
        temp_path: &Path,
        content: &Bytes,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), BlobError> {
        let mut file = fs::File::create(temp_path).await?;
        let total = content.len();
        let mut written = 0;

        for chunk in content.chunks(self.chunk_size) {
            file.write_all(chunk).await?;
            written += chunk.len();
            if let Some(report) = progress {
                report(fraction(written, total));
            }
        }

        file.flush().await?;
        if total == 0 {
            if let Some(report) = progress {
                report(1.0);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn upload_blob(
        &self,
        content: Bytes,
        key: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String, BlobError> {
        let final_path = self.blob_path(key)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = final_path.clone().into_os_string();
        temp_name.push(".part");
        let temp_path = PathBuf::from(temp_name);

        if let Err(e) = self.write_chunks(&temp_path, &content, progress.as_ref()).await {
            error!("Failed to write blob {key}: {e}");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            error!("Failed to move blob {key} into place: {e}");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        info!("Stored blob {key} ({} bytes)", content.len());
        Ok(self.urls.url_for(key))
    }

    async fn delete_blob(&self, url: &str) -> Result<(), BlobError> {
        let key = self.urls.key_for(url)?;
        let path = self.blob_path(&key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted blob {key}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(url.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
