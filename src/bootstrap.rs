//! System-folder bootstrapper
//!
//! Makes sure every project has its well-known root folders.

use futures::future::join_all;
use log::{error, info};
use std::collections::HashSet;

use crate::error::Result;
use crate::folders::FolderDirectory;
use crate::model::Creator;
use crate::path;

pub const SYSTEM_FOLDERS: [&str; 4] = ["chats", "discussions", "documents", "assets"];

/// Create whichever system folders are missing at the project root.
///
/// Missing folders are created concurrently. Returns the names created, in
/// `SYSTEM_FOLDERS` order. Concurrent callers may both create the same
/// folder; the deterministic folder id makes the second write an overwrite.
pub async fn ensure_system_folders(
    folders: &FolderDirectory,
    project_id: &str,
    creator: &Creator,
) -> Result<Vec<String>> {
    let existing: HashSet<String> = folders
        .list(project_id, path::ROOT)
        .await?
        .into_iter()
        .map(|f| f.name)
        .collect();

    let missing: Vec<&str> = SYSTEM_FOLDERS
        .iter()
        .copied()
        .filter(|name| !existing.contains(*name))
        .collect();

    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let results = join_all(
        missing
            .iter()
            .map(|name| folders.create_system(project_id, path::ROOT, name, creator)),
    )
    .await;

    let mut created = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(folder) => created.push(folder.name),
            Err(e) => {
                error!("Failed to bootstrap system folders for {project_id}: {e}");
                return Err(e);
            }
        }
    }

    info!("Bootstrapped {} system folders for {project_id}: {:?}", created.len(), created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn creates_only_missing_folders() {
        let folders = FolderDirectory::new(Arc::new(MemoryDocumentStore::new()));
        let creator = Creator::new("u1", "Ada");
        folders.create("p1", "/", "chats", &creator).await.unwrap();

        let created = ensure_system_folders(&folders, "p1", &creator).await.unwrap();
        assert_eq!(created, ["discussions", "documents", "assets"]);

        let again = ensure_system_folders(&folders, "p1", &creator).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(folders.list("p1", "/").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn system_folder_moved_off_root_is_recreated_without_loss() {
        let folders = FolderDirectory::new(Arc::new(MemoryDocumentStore::new()));
        let creator = Creator::new("u1", "Ada");
        ensure_system_folders(&folders, "p1", &creator).await.unwrap();

        let assets = crate::model::folder_id("p1", "/", "assets");
        folders.move_folder("p1", &assets, "/documents").await.unwrap();

        let created = ensure_system_folders(&folders, "p1", &creator).await.unwrap();
        assert_eq!(created, ["assets"]);
        assert_eq!(folders.list("p1", "/").await.unwrap().len(), 4);
        let moved = folders.list("p1", "/documents").await.unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].name, "assets");
    }

    #[tokio::test]
    async fn concurrent_bootstraps_do_not_duplicate() {
        let folders = FolderDirectory::new(Arc::new(MemoryDocumentStore::new()));
        let creator = Creator::new("u1", "Ada");

        let (a, b) = tokio::join!(
            ensure_system_folders(&folders, "p1", &creator),
            ensure_system_folders(&folders, "p1", &creator)
        );
        a.unwrap();
        b.unwrap();

        let names: HashSet<_> = folders
            .list("p1", "/")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names.len(), SYSTEM_FOLDERS.len());
    }
}
