//! File service facade
//!
//! Per-principal entry points: rate limit, authorize, then delegate to the
//! folder directory, file registry, or image uploader.

use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{AccessPolicy, AccessRequest, Principal, ProjectAccess};
use crate::bootstrap::ensure_system_folders;
use crate::config::ServiceConfig;
use crate::error::{FileServiceError, PolicyError, Result};
use crate::files::FileRegistry;
use crate::folders::{FolderDirectory, MoveSummary};
use crate::middleware::RateLimiter;
use crate::middleware::logging::{log_rejection, log_request};
use crate::model::{Creator, FileRecord, FolderRecord, UploadFile};
use crate::storage::{BlobStore, FilesystemBlobStore, ProgressCallback};
use crate::store::{DocumentStore, MemoryDocumentStore};
use crate::upload::{ImageUploader, UploadValidator};

pub struct FileService {
    folders: FolderDirectory,
    files: FileRegistry,
    images: ImageUploader,
    policy: AccessPolicy,
    limiter: Mutex<RateLimiter>,
}

impl FileService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: &ServiceConfig,
    ) -> Self {
        let validator = UploadValidator::new(config.limits.clone());
        Self {
            folders: FolderDirectory::new(Arc::clone(&store)),
            files: FileRegistry::new(store, Arc::clone(&blobs), validator.clone()),
            images: ImageUploader::new(blobs, validator),
            policy: AccessPolicy::new(),
            limiter: Mutex::new(RateLimiter::from_settings(&config.rate_limit)),
        }
    }

    /// In-memory documents with blobs on the local filesystem. Documents do
    /// not outlive the service.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::from_settings(&config.storage));
        info!("Blob root: {}", config.storage.blob_root);
        Self::new(store, blobs, config)
    }

    pub fn folders(&self) -> &FolderDirectory {
        &self.folders
    }

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    async fn admit(
        &self,
        principal: &Principal,
        operation: &str,
        scope: &str,
        request: AccessRequest<'_>,
    ) -> Result<()> {
        log_request(principal, operation, scope);

        let allowed = self.limiter.lock().await.check(principal.key());
        let outcome = if allowed {
            self.policy.authorize(principal, &request)
        } else {
            Err(PolicyError::RateLimited(principal.key().to_string()))
        };

        outcome.map_err(|e| {
            let err = FileServiceError::from(e);
            log_rejection(principal, operation, &err);
            err
        })
    }

    pub async fn list_files(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        path: &str,
    ) -> Result<Vec<FileRecord>> {
        self.admit(principal, "list_files", &project.project_id, AccessRequest::ReadFiles(project))
            .await?;
        self.files.list(&project.project_id, path).await
    }

    pub async fn list_folders(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        path: &str,
    ) -> Result<Vec<FolderRecord>> {
        self.admit(principal, "list_folders", &project.project_id, AccessRequest::ReadFiles(project))
            .await?;
        self.folders.list(&project.project_id, path).await
    }

    pub async fn upload_file(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        path: &str,
        file: UploadFile,
        progress: Option<ProgressCallback>,
        creator: Option<Creator>,
    ) -> Result<FileRecord> {
        self.admit(principal, "upload_file", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        self.files
            .upload(file, &project.project_id, path, progress, creator)
            .await
    }

    /// Delete a file by id; an already-deleted record is not an error
    pub async fn delete_file(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        file_id: &str,
    ) -> Result<()> {
        self.admit(principal, "delete_file", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        match self.files.get(&project.project_id, file_id).await? {
            Some(record) => self.files.delete(&project.project_id, file_id, &record.url).await,
            None => Ok(()),
        }
    }

    pub async fn move_file(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        file_id: &str,
        new_path: &str,
    ) -> Result<()> {
        self.admit(principal, "move_file", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        self.files.move_file(&project.project_id, file_id, new_path).await
    }

    pub async fn create_folder(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        parent_path: &str,
        name: &str,
        creator: &Creator,
    ) -> Result<FolderRecord> {
        self.admit(principal, "create_folder", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        self.folders
            .create(&project.project_id, parent_path, name, creator)
            .await
    }

    pub async fn delete_folder(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        folder_id: &str,
    ) -> Result<()> {
        self.admit(principal, "delete_folder", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        self.folders.delete(&project.project_id, folder_id).await
    }

    pub async fn move_folder(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        folder_id: &str,
        new_parent_path: &str,
    ) -> Result<MoveSummary> {
        self.admit(principal, "move_folder", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        self.folders
            .move_folder(&project.project_id, folder_id, new_parent_path)
            .await
    }

    pub async fn storage_used(&self, principal: &Principal, project: &ProjectAccess) -> Result<u64> {
        self.admit(principal, "storage_used", &project.project_id, AccessRequest::ReadFiles(project))
            .await?;
        self.files.total_storage_used(&project.project_id).await
    }

    pub async fn bootstrap(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        creator: &Creator,
    ) -> Result<Vec<String>> {
        self.admit(principal, "bootstrap", &project.project_id, AccessRequest::WriteFiles(project))
            .await?;
        ensure_system_folders(&self.folders, &project.project_id, creator).await
    }

    /// Store a new profile image for the signed-in user and return its URL
    pub async fn upload_profile_image(&self, principal: &Principal, file: UploadFile) -> Result<String> {
        let uid = principal.uid.clone().ok_or(PolicyError::Unauthenticated)?;
        self.admit(principal, "upload_profile_image", &uid, AccessRequest::WriteUser { user_id: &uid })
            .await?;
        self.images.upload_profile_image(&uid, file).await
    }

    pub async fn upload_cover_image(
        &self,
        principal: &Principal,
        project: &ProjectAccess,
        file: UploadFile,
    ) -> Result<String> {
        self.admit(
            principal,
            "upload_cover_image",
            &project.project_id,
            AccessRequest::WriteProject(project),
        )
        .await?;
        self.images.upload_cover_image(&project.project_id, file).await
    }
}
