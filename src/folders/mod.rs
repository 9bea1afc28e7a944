//! Folder directory
//!
//! Folder records keyed by (project, parent path, name). Folders are plain
//! documents: deleting one does not touch its contents, and moving one only
//! rewrites its direct children.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::error::{PathError, Result, StoreError};
use crate::model::{Creator, FolderRecord, fields, folder_id};
use crate::path;
use crate::store::{
    CollectionRef, Direction, Document, DocumentStore, Query, WriteBatch, decode, encode, single_field,
};

/// Outcome of a folder move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSummary {
    pub folder_id: String,
    pub old_path: String,
    pub new_path: String,
    pub files_moved: usize,
    pub folders_moved: usize,
}

#[derive(Clone)]
pub struct FolderDirectory {
    store: Arc<dyn DocumentStore>,
}

impl FolderDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create (or overwrite) the folder `name` under `parent_path`
    pub async fn create(
        &self,
        project_id: &str,
        parent_path: &str,
        name: &str,
        creator: &Creator,
    ) -> Result<FolderRecord> {
        self.write_folder(project_id, parent_path, name, creator, false).await
    }

    /// Same as [`create`](Self::create) but flags the folder as a system folder
    pub async fn create_system(
        &self,
        project_id: &str,
        parent_path: &str,
        name: &str,
        creator: &Creator,
    ) -> Result<FolderRecord> {
        self.write_folder(project_id, parent_path, name, creator, true).await
    }

    async fn write_folder(
        &self,
        project_id: &str,
        parent_path: &str,
        name: &str,
        creator: &Creator,
        is_system: bool,
    ) -> Result<FolderRecord> {
        let parent_path = path::validate(parent_path)?;
        path::validate_name(name)?;

        let record = FolderRecord {
            id: folder_id(project_id, &parent_path, name),
            name: name.to_string(),
            path: parent_path,
            created_at: Utc::now(),
            created_by: creator.clone(),
            project_id: project_id.to_string(),
            is_system,
        };

        let collection = CollectionRef::folders(project_id);
        let doc = encode(&record.id, &record)?;
        self.store
            .set(&collection, &record.id, doc)
            .await
            .inspect_err(|e| error!("Failed to create folder {}: {e}", record.full_path()))?;

        info!("Created folder {} in project {project_id}", record.full_path());
        Ok(record)
    }

    /// Folders directly under `path`, newest first
    pub async fn list(&self, project_id: &str, path: &str) -> Result<Vec<FolderRecord>> {
        let path = path::validate(path)?;
        let query = Query::new()
            .where_eq(fields::PATH, path.as_str())
            .order_by(fields::CREATED_AT, Direction::Descending);

        let docs = self
            .store
            .query(&CollectionRef::folders(project_id), &query)
            .await
            .inspect_err(|e| error!("Failed to list folders at {path}: {e}"))?;

        docs.into_iter()
            .map(|(id, doc)| decode(&id, doc).map_err(Into::into))
            .collect()
    }

    pub async fn get(&self, project_id: &str, folder_id: &str) -> Result<Option<FolderRecord>> {
        let doc = self
            .store
            .get(&CollectionRef::folders(project_id), folder_id)
            .await
            .inspect_err(|e| error!("Failed to load folder {folder_id}: {e}"))?;
        match doc {
            Some(doc) => Ok(Some(decode(folder_id, doc)?)),
            None => Ok(None),
        }
    }

    /// Remove the folder document only; children are left in place
    pub async fn delete(&self, project_id: &str, folder_id: &str) -> Result<()> {
        self.store
            .delete(&CollectionRef::folders(project_id), folder_id)
            .await
            .inspect_err(|e| error!("Failed to delete folder {folder_id}: {e}"))?;
        info!("Deleted folder {folder_id} in project {project_id}");
        Ok(())
    }

    /// Move a folder under `new_parent_path` and rewrite its direct children.
    ///
    /// Folder ids derive from (project, parent path, name), so the folder is
    /// written under its new id and the old document removed. A move onto a
    /// folder that already exists at the destination is refused.
    ///
    /// The writes are independent: the folder itself, then one batch for
    /// child files, then one batch for child folders. A failure part way
    /// through leaves earlier writes in place.
    pub async fn move_folder(
        &self,
        project_id: &str,
        folder_id: &str,
        new_parent_path: &str,
    ) -> Result<MoveSummary> {
        let new_parent = path::validate(new_parent_path)?;
        let folders = CollectionRef::folders(project_id);
        let files = CollectionRef::files(project_id);

        let folder = self.get(project_id, folder_id).await?.ok_or_else(|| StoreError::NotFound {
            collection: folders.path(),
            id: folder_id.to_string(),
        })?;

        let old_path = folder.full_path();
        if new_parent == old_path || new_parent.starts_with(&format!("{old_path}/")) {
            return Err(PathError::MoveIntoSelf(new_parent).into());
        }
        let new_path = path::folder_full_path(&new_parent, &folder.name);
        let new_id = crate::model::folder_id(project_id, &new_parent, &folder.name);

        if new_id == folder.id {
            debug!("Folder {old_path} already under {new_parent}");
            return Ok(MoveSummary {
                folder_id: new_id,
                old_path,
                new_path,
                files_moved: 0,
                folders_moved: 0,
            });
        }
        self.rekey(&folders, folder, &new_id, &new_parent, &new_path).await?;

        let files_moved = self.rewrite_child_files(&files, &old_path, &new_path).await?;
        let folders_moved = self
            .rewrite_child_folders(&folders, &old_path, &new_path)
            .await
            .inspect_err(|_| {
                warn!("Folder {new_id} moved with its files but not its subfolders; {old_path} is partially moved")
            })?;

        info!(
            "Moved folder {old_path} -> {new_path} ({files_moved} files, {folders_moved} folders)"
        );
        Ok(MoveSummary {
            folder_id: new_id,
            old_path,
            new_path,
            files_moved,
            folders_moved,
        })
    }

    // Write the folder under `new_id`, then drop the document at its old id.
    async fn rekey(
        &self,
        folders: &CollectionRef,
        folder: FolderRecord,
        new_id: &str,
        new_parent: &str,
        new_path: &str,
    ) -> Result<()> {
        if self.store.get(folders, new_id).await?.is_some() {
            return Err(PathError::AlreadyExists(new_path.to_string()).into());
        }

        let old_id = folder.id.clone();
        let moved = FolderRecord {
            id: new_id.to_string(),
            path: new_parent.to_string(),
            ..folder
        };
        let doc = encode(&moved.id, &moved)?;
        self.store
            .set(folders, new_id, doc)
            .await
            .inspect_err(|e| error!("Failed to write moved folder {new_path}: {e}"))?;

        self.store
            .delete(folders, &old_id)
            .await
            .inspect_err(|e| warn!("Folder {new_path} written but old document {old_id} remains: {e}"))?;
        Ok(())
    }

    async fn children(
        &self,
        collection: &CollectionRef,
        old_path: &str,
    ) -> Result<Vec<(String, Document)>> {
        let children = self
            .store
            .query(collection, &Query::new().where_eq(fields::PATH, old_path))
            .await
            .inspect_err(|e| error!("Failed to query children of {old_path} in {collection}: {e}"))?;
        Ok(children)
    }

    async fn commit_rewrite(&self, batch: WriteBatch, old_path: &str, collection: &CollectionRef) -> Result<()> {
        if !batch.is_empty() {
            self.store
                .commit(batch)
                .await
                .inspect_err(|e| error!("Failed to rewrite children of {old_path} in {collection}: {e}"))?;
        }
        Ok(())
    }

    async fn rewrite_child_files(
        &self,
        files: &CollectionRef,
        old_path: &str,
        new_path: &str,
    ) -> Result<usize> {
        let mut batch = WriteBatch::new();
        for (id, _) in self.children(files, old_path).await? {
            batch.update(files, &id, single_field(fields::PATH, new_path));
        }
        let count = batch.len();
        self.commit_rewrite(batch, old_path, files).await?;
        Ok(count)
    }

    // Child folders change parent, so each one moves to the id of its new tuple.
    async fn rewrite_child_folders(
        &self,
        folders: &CollectionRef,
        old_path: &str,
        new_path: &str,
    ) -> Result<usize> {
        let mut batch = WriteBatch::new();
        let mut count = 0;
        for (id, doc) in self.children(folders, old_path).await? {
            let child: FolderRecord = decode(&id, doc)?;
            let moved = FolderRecord {
                id: folder_id(&child.project_id, new_path, &child.name),
                path: new_path.to_string(),
                ..child
            };
            batch.set(folders, &moved.id, encode(&moved.id, &moved)?);
            batch.delete(folders, &id);
            count += 1;
        }
        self.commit_rewrite(batch, old_path, folders).await?;
        Ok(count)
    }
}
