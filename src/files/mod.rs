//! File registry
//!
//! Creates, lists, moves, and deletes file records, and keeps the backing
//! blobs in step. Every record carries a provenance tag saying which feature
//! produced it.

use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;

use crate::error::{BlobError, Result, StoreError};
use crate::folders::FolderDirectory;
use crate::model::{
    Creator, FileDescriptor, FileRecord, Provenance, UploadFile, fields, file_id,
};
use crate::path;
use crate::storage::{BlobStore, ProgressCallback, keys};
use crate::store::{CollectionRef, Direction, DocumentStore, Query, decode, encode, single_field};
use crate::upload::UploadValidator;

pub const CHATS_PATH: &str = "/chats";
pub const DISCUSSIONS_PATH: &str = "/discussions";

/// Where attachments from a conversation feature are filed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentTarget {
    Chat,
    Discussion,
}

impl AttachmentTarget {
    pub fn folder_name(&self) -> &'static str {
        match self {
            AttachmentTarget::Chat => "chats",
            AttachmentTarget::Discussion => "discussions",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            AttachmentTarget::Chat => CHATS_PATH,
            AttachmentTarget::Discussion => DISCUSSIONS_PATH,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            AttachmentTarget::Chat => Provenance::Chat,
            AttachmentTarget::Discussion => Provenance::Discussion,
        }
    }
}

/// Query used to list a virtual path.
///
/// `/chats` and `/discussions` are listed by provenance, whatever path the
/// records hold. Every other path, root included, lists the manual uploads
/// stored at exactly that path; tagged records only ever show up in the two
/// provenance listings.
pub fn listing_query(requested: &str) -> Query {
    let query = match requested {
        DISCUSSIONS_PATH => Query::new().where_eq(fields::SOURCE, Provenance::Discussion.as_str()),
        CHATS_PATH => Query::new().where_eq(fields::SOURCE, Provenance::Chat.as_str()),
        // Tagged records keep their tag when moved, so they stay out of path listings
        other => Query::new()
            .where_eq(fields::PATH, other)
            .where_eq(fields::SOURCE, Provenance::Manual.as_str()),
    };
    query.order_by(fields::CREATED_AT, Direction::Descending)
}

#[derive(Clone)]
pub struct FileRegistry {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    folders: FolderDirectory,
    validator: UploadValidator,
}

impl FileRegistry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        validator: UploadValidator,
    ) -> Self {
        let folders = FolderDirectory::new(Arc::clone(&store));
        Self {
            store,
            blobs,
            folders,
            validator,
        }
    }

    /// Upload content and register it under `path` as a manual upload
    pub async fn upload(
        &self,
        file: UploadFile,
        project_id: &str,
        path: &str,
        progress: Option<ProgressCallback>,
        creator: Option<Creator>,
    ) -> Result<FileRecord> {
        let path = path::validate(path)?;
        self.validator.validate_attachment(&file)?;

        let now = Utc::now();
        let key = keys::project_file(project_id, &file.name, now);
        let size = file.size();
        let url = self
            .blobs
            .upload_blob(file.content, &key, progress)
            .await
            .inspect_err(|e| error!("Failed to upload {} to {key}: {e}", file.name))?;

        let record = FileRecord {
            id: file_id(project_id, &path, &file.name, now),
            name: file.name,
            mime_type: file.mime_type,
            size,
            url,
            path,
            created_at: now,
            created_by: creator.unwrap_or_else(Creator::unknown),
            source: Provenance::Manual,
            project_id: project_id.to_string(),
        };
        self.put(&record).await?;

        info!(
            "Uploaded {} ({} bytes) to {} in project {project_id}",
            record.name, record.size, record.path
        );
        Ok(record)
    }

    /// Files visible at `path`, newest first
    pub async fn list(&self, project_id: &str, path: &str) -> Result<Vec<FileRecord>> {
        let path = path::validate(path)?;
        let docs = self
            .store
            .query(&CollectionRef::files(project_id), &listing_query(&path))
            .await
            .inspect_err(|e| error!("Failed to list files at {path}: {e}"))?;

        docs.into_iter()
            .map(|(id, doc)| decode(&id, doc).map_err(Into::into))
            .collect()
    }

    pub async fn get(&self, project_id: &str, file_id: &str) -> Result<Option<FileRecord>> {
        let doc = self
            .store
            .get(&CollectionRef::files(project_id), file_id)
            .await
            .inspect_err(|e| error!("Failed to load file {file_id}: {e}"))?;
        match doc {
            Some(doc) => Ok(Some(decode(file_id, doc)?)),
            None => Ok(None),
        }
    }

    /// Delete the blob, then the record.
    ///
    /// A blob that is already gone counts as deleted. Any other blob failure
    /// stops before the record is touched so the call can be retried.
    pub async fn delete(&self, project_id: &str, file_id: &str, url: &str) -> Result<()> {
        match self.blobs.delete_blob(url).await {
            Ok(()) => {}
            Err(BlobError::NotFound(_)) => warn!("Blob for file {file_id} already removed: {url}"),
            Err(e) => {
                error!("Failed to delete blob for file {file_id}: {e}");
                return Err(e.into());
            }
        }

        self.store
            .delete(&CollectionRef::files(project_id), file_id)
            .await
            .inspect_err(|e| error!("Failed to delete file record {file_id}: {e}"))?;

        info!("Deleted file {file_id} in project {project_id}");
        Ok(())
    }

    /// Point a file at a new path. The destination is not checked.
    pub async fn move_file(&self, project_id: &str, file_id: &str, new_path: &str) -> Result<()> {
        self.store
            .update(
                &CollectionRef::files(project_id),
                file_id,
                single_field(fields::PATH, new_path),
            )
            .await
            .inspect_err(|e| error!("Failed to move file {file_id} to {new_path}: {e}"))?;
        info!("Moved file {file_id} to {new_path}");
        Ok(())
    }

    pub async fn add_from_chat(
        &self,
        file: FileDescriptor,
        project_id: &str,
        creator: &Creator,
    ) -> Result<FileRecord> {
        self.add_attachment(file, project_id, creator, AttachmentTarget::Chat)
            .await
    }

    pub async fn add_from_discussion(
        &self,
        file: FileDescriptor,
        project_id: &str,
        creator: &Creator,
    ) -> Result<FileRecord> {
        self.add_attachment(file, project_id, creator, AttachmentTarget::Discussion)
            .await
    }

    /// Register an already-stored attachment in its well-known folder
    pub async fn add_attachment(
        &self,
        file: FileDescriptor,
        project_id: &str,
        creator: &Creator,
        target: AttachmentTarget,
    ) -> Result<FileRecord> {
        self.ensure_target_folder(project_id, creator, target).await?;

        let now = Utc::now();
        let record = FileRecord {
            id: file_id(project_id, target.path(), &file.name, now),
            name: file.name,
            mime_type: file.mime_type,
            size: file.size,
            url: file.url,
            path: target.path().to_string(),
            created_at: now,
            created_by: creator.clone(),
            source: target.provenance(),
            project_id: project_id.to_string(),
        };
        self.put(&record).await?;

        info!(
            "Added {} attachment {} to project {project_id}",
            record.source, record.name
        );
        Ok(record)
    }

    /// Validate, upload, and register a batch of chat attachments
    pub async fn attach_to_chat(
        &self,
        project_id: &str,
        files: Vec<UploadFile>,
        creator: &Creator,
    ) -> Result<Vec<FileRecord>> {
        self.attach(project_id, files, creator, AttachmentTarget::Chat)
            .await
    }

    /// Validate, upload, and register a batch of discussion attachments
    pub async fn attach_to_discussion(
        &self,
        project_id: &str,
        files: Vec<UploadFile>,
        creator: &Creator,
    ) -> Result<Vec<FileRecord>> {
        self.attach(project_id, files, creator, AttachmentTarget::Discussion)
            .await
    }

    async fn attach(
        &self,
        project_id: &str,
        files: Vec<UploadFile>,
        creator: &Creator,
        target: AttachmentTarget,
    ) -> Result<Vec<FileRecord>> {
        self.validator.validate_attachment_batch(&files)?;

        let mut records = Vec::with_capacity(files.len());
        for file in files {
            let key = keys::attachment(project_id, &file.name, Utc::now());
            let size = file.size();
            let url = self
                .blobs
                .upload_blob(file.content, &key, None)
                .await
                .inspect_err(|e| error!("Failed to upload attachment {}: {e}", file.name))?;

            let descriptor = FileDescriptor {
                name: file.name,
                mime_type: file.mime_type,
                size,
                url,
            };
            records.push(self.add_attachment(descriptor, project_id, creator, target).await?);
        }
        Ok(records)
    }

    /// Sum of `size` over every file in the project. Scans the whole collection.
    pub async fn total_storage_used(&self, project_id: &str) -> Result<u64> {
        let docs = self
            .store
            .query(&CollectionRef::files(project_id), &Query::new())
            .await
            .inspect_err(|e| error!("Failed to scan files of project {project_id}: {e}"))?;

        let mut total = 0u64;
        for (id, doc) in docs {
            let record: FileRecord = decode(&id, doc)?;
            total += record.size;
        }
        Ok(total)
    }

    async fn ensure_target_folder(
        &self,
        project_id: &str,
        creator: &Creator,
        target: AttachmentTarget,
    ) -> Result<()> {
        let name = target.folder_name();
        let at_root = self.folders.list(project_id, path::ROOT).await?;
        if !at_root.iter().any(|folder| folder.name == name) {
            self.folders
                .create_system(project_id, path::ROOT, name, creator)
                .await?;
        }
        Ok(())
    }

    async fn put(&self, record: &FileRecord) -> std::result::Result<(), StoreError> {
        let doc = encode(&record.id, record)?;
        self.store
            .set(&CollectionRef::files(&record.project_id), &record.id, doc)
            .await
            .inspect_err(|e| error!("Failed to write file record {}: {e}", record.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileServiceError, PathError, ValidationError};
    use crate::storage::MemoryBlobStore;
    use crate::store::MemoryDocumentStore;

    fn registry() -> (FileRegistry, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new("mem://b"));
        let registry = FileRegistry::new(
            Arc::new(MemoryDocumentStore::new()),
            blobs.clone(),
            UploadValidator::default(),
        );
        (registry, blobs)
    }

    #[test]
    fn listing_dispatch() {
        let doc = |path: &str, source: &str| {
            let mut d = single_field(fields::PATH, path);
            d.insert(fields::SOURCE.into(), source.into());
            d
        };
        assert!(listing_query("/").matches(&doc("/", "manual")));
        assert!(!listing_query("/").matches(&doc("/", "chat")));
        assert!(listing_query("/chats").matches(&doc("/anywhere", "chat")));
        assert!(listing_query("/discussions").matches(&doc("/x/y", "discussion")));
        assert!(!listing_query("/discussions").matches(&doc("/discussions", "manual")));
        assert!(listing_query("/docs").matches(&doc("/docs", "manual")));
        assert!(!listing_query("/docs").matches(&doc("/docs", "discussion")));
    }

    #[tokio::test]
    async fn upload_without_creator_uses_unknown() {
        let (registry, _) = registry();
        let record = registry
            .upload(UploadFile::new("a.txt", "text/plain", "abc"), "p1", "/docs/", None, None)
            .await
            .unwrap();
        assert_eq!(record.path, "/docs");
        assert_eq!(record.size, 3);
        assert_eq!(record.source, Provenance::Manual);
        assert_eq!(record.created_by, Creator::unknown());
    }

    #[tokio::test]
    async fn invalid_path_fails_before_upload() {
        let (registry, blobs) = registry();
        let err = registry
            .upload(UploadFile::new("a.txt", "text/plain", "abc"), "p1", "/../x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FileServiceError::Path(PathError::Traversal(_))));
        assert_eq!(blobs.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_fails_before_upload() {
        let (registry, blobs) = registry();
        let big = UploadFile::new("big.bin", "application/octet-stream", vec![0u8; 6 * 1024 * 1024]);
        let err = registry.upload(big, "p1", "/", None, None).await.unwrap_err();
        assert!(matches!(
            err,
            FileServiceError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert_eq!(blobs.calls(), 0);
    }

    #[tokio::test]
    async fn chat_attachment_creates_system_folder_once() {
        let (registry, _) = registry();
        let creator = Creator::new("u1", "Ada");
        let descriptor = FileDescriptor {
            name: "pic.png".into(),
            mime_type: "image/png".into(),
            size: 10,
            url: "mem://b/attachments/p1/1_pic.png".into(),
        };

        registry.add_from_chat(descriptor.clone(), "p1", &creator).await.unwrap();
        let record = registry.add_from_chat(descriptor, "p1", &creator).await.unwrap();
        assert_eq!(record.path, CHATS_PATH);
        assert_eq!(record.source, Provenance::Chat);

        let roots = registry.folders.list("p1", "/").await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "chats");
        assert!(roots[0].is_system);
    }

    #[tokio::test]
    async fn chat_folder_is_recreated_after_being_moved_away() {
        let (registry, _) = registry();
        let creator = Creator::new("u1", "Ada");
        let descriptor = FileDescriptor {
            name: "pic.png".into(),
            mime_type: "image/png".into(),
            size: 10,
            url: "mem://b/attachments/p1/1_pic.png".into(),
        };

        registry.add_from_chat(descriptor.clone(), "p1", &creator).await.unwrap();
        let chats = registry.folders.list("p1", "/").await.unwrap().remove(0);
        registry.folders.move_folder("p1", &chats.id, "/old").await.unwrap();
        registry.add_from_chat(descriptor, "p1", &creator).await.unwrap();

        let roots: Vec<_> = registry
            .folders
            .list("p1", "/")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(roots, ["chats"]);
        assert_eq!(registry.folders.list("p1", "/old").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn too_many_attachments_upload_nothing() {
        let (registry, blobs) = registry();
        let files: Vec<_> = (0..11)
            .map(|i| UploadFile::new(format!("{i}.txt"), "text/plain", "x"))
            .collect();
        let err = registry
            .attach_to_chat("p1", files, &Creator::new("u1", "Ada"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FileServiceError::Validation(ValidationError::TooManyFiles { count: 11, limit: 10 })
        ));
        assert_eq!(blobs.calls(), 0);
    }

    #[tokio::test]
    async fn discussion_batch_is_stored_under_attachments() {
        let (registry, blobs) = registry();
        let files = vec![
            UploadFile::new("a.txt", "text/plain", "aa"),
            UploadFile::new("b.txt", "text/plain", "bbb"),
        ];
        let records = registry
            .attach_to_discussion("p1", files, &Creator::new("u1", "Ada"))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record.url.starts_with("mem://b/attachments/p1/"));
            assert!(blobs.contains_url(&record.url).await);
            assert_eq!(record.source, Provenance::Discussion);
        }
        assert_eq!(registry.total_storage_used("p1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn move_file_accepts_any_destination() {
        let (registry, _) = registry();
        let record = registry
            .upload(UploadFile::new("a.txt", "text/plain", "abc"), "p1", "/", None, None)
            .await
            .unwrap();
        registry.move_file("p1", &record.id, "/nowhere/at/all").await.unwrap();
        let moved = registry.get("p1", &record.id).await.unwrap().unwrap();
        assert_eq!(moved.path, "/nowhere/at/all");
    }
}
