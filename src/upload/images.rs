//! Profile and cover image uploads
//!
//! Validates the image, then stores it in its namespace and returns the URL.
//! Updating the owning profile or project document is left to the caller.

use chrono::Utc;
use log::{error, info};
use std::sync::Arc;

use super::UploadValidator;
use crate::error::Result;
use crate::model::UploadFile;
use crate::storage::{BlobStore, keys};

pub struct ImageUploader {
    blobs: Arc<dyn BlobStore>,
    validator: UploadValidator,
}

impl ImageUploader {
    pub fn new(blobs: Arc<dyn BlobStore>, validator: UploadValidator) -> Self {
        Self { blobs, validator }
    }

    pub async fn upload_profile_image(&self, user_id: &str, file: UploadFile) -> Result<String> {
        self.validator.validate_profile_image(&file)?;
        let key = keys::profile_image(user_id, &file.name, Utc::now());
        let url = self
            .blobs
            .upload_blob(file.content, &key, None)
            .await
            .inspect_err(|e| error!("Profile image upload failed for {user_id}: {e}"))?;
        info!("Uploaded profile image for {user_id}");
        Ok(url)
    }

    pub async fn upload_cover_image(&self, project_id: &str, file: UploadFile) -> Result<String> {
        self.validator.validate_cover_image(&file)?;
        let key = keys::cover_image(project_id, &file.name, Utc::now());
        let url = self
            .blobs
            .upload_blob(file.content, &key, None)
            .await
            .inspect_err(|e| error!("Cover image upload failed for {project_id}: {e}"))?;
        info!("Uploaded cover image for {project_id}");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileServiceError, ValidationError};
    use crate::storage::MemoryBlobStore;

    #[tokio::test]
    async fn oversized_profile_image_never_reaches_storage() {
        let blobs = Arc::new(MemoryBlobStore::new("mem://b"));
        let uploader = ImageUploader::new(blobs.clone(), UploadValidator::default());

        let file = UploadFile::new("me.png", "image/png", vec![0u8; 6 * 1024 * 1024]);
        let err = uploader.upload_profile_image("u1", file).await.unwrap_err();

        assert!(matches!(
            err,
            FileServiceError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert_eq!(blobs.calls(), 0);
    }

    #[tokio::test]
    async fn cover_image_lands_in_cover_namespace() {
        let blobs = Arc::new(MemoryBlobStore::new("mem://b"));
        let uploader = ImageUploader::new(blobs.clone(), UploadValidator::default());

        let url = uploader
            .upload_cover_image("p1", UploadFile::new("c.jpg", "image/jpeg", vec![1u8, 2, 3]))
            .await
            .unwrap();

        assert!(url.starts_with("mem://b/projects/cover-images/p1_"));
        assert!(blobs.contains_url(&url).await);
    }
}
