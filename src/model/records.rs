//! File and folder records
//!
//! Records are stored as documents; field names follow the camelCase
//! document schema so filters can name them directly.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document field names used in queries and updates
pub mod fields {
    pub const PATH: &str = "path";
    pub const SOURCE: &str = "source";
    pub const CREATED_AT: &str = "createdAt";
}

/// Who created a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Creator {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Used when an upload arrives without a creator
    pub fn unknown() -> Self {
        Self::new("unknown", "Unknown")
    }
}

/// Which feature produced a file record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Manual,
    Chat,
    Discussion,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Chat => "chat",
            Provenance::Discussion => "discussion",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
    /// Virtual folder path, e.g. `/documents`
    pub path: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub created_by: Creator,
    pub source: Provenance,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    /// Path of the parent folder
    pub path: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub created_by: Creator,
    pub project_id: String,
    #[serde(default)]
    pub is_system: bool,
}

impl FolderRecord {
    /// Virtual path of the folder's own contents
    pub fn full_path(&self) -> String {
        crate::path::folder_full_path(&self.path, &self.name)
    }
}

/// A file that has already been stored and only needs a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
}

/// Binary content waiting to be uploaded
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Deterministic folder id: identical (project, parent, name) tuples share a document
pub fn folder_id(project_id: &str, parent_path: &str, name: &str) -> String {
    format!(
        "{}_{}_{}",
        encode_id_part(project_id),
        encode_id_part(parent_path),
        encode_id_part(name)
    )
}

pub fn file_id(project_id: &str, path: &str, name: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}_{}",
        encode_id_part(project_id),
        encode_id_part(path),
        encode_id_part(name),
        created_at.timestamp_millis()
    )
}

// Escapes everything outside [A-Za-z0-9.-] so distinct tuples never share an id.
fn encode_id_part(part: &str) -> String {
    let mut encoded = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("~{byte:02x}"));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn folder_ids_are_deterministic_and_unambiguous() {
        assert_eq!(folder_id("p1", "/", "chats"), folder_id("p1", "/", "chats"));
        assert_ne!(folder_id("p1", "/a", "b_c"), folder_id("p1", "/a_b", "c"));
        assert!(!folder_id("p1", "/docs", "x").contains('/'));
    }

    #[test]
    fn file_id_includes_timestamp() {
        let t1 = Utc.timestamp_millis_opt(1_000).unwrap();
        let t2 = Utc.timestamp_millis_opt(2_000).unwrap();
        assert_ne!(file_id("p", "/", "a.txt", t1), file_id("p", "/", "a.txt", t2));
    }

    #[test]
    fn record_serializes_with_document_field_names() {
        let record = FileRecord {
            id: "f1".into(),
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 3,
            url: "http://x/a".into(),
            path: "/".into(),
            created_at: Utc.timestamp_millis_opt(42).unwrap(),
            created_by: Creator::new("u1", "Ada"),
            source: Provenance::Discussion,
            project_id: "p".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value[fields::CREATED_AT], 42);
        assert_eq!(value[fields::SOURCE], "discussion");
        assert_eq!(value["projectId"], "p");
        assert!(value["createdBy"].get("avatarUrl").is_none());

        let back: FileRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn full_path_of_root_folder() {
        let folder = FolderRecord {
            id: "x".into(),
            name: "chats".into(),
            path: "/".into(),
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
            created_by: Creator::unknown(),
            project_id: "p".into(),
            is_system: true,
        };
        assert_eq!(folder.full_path(), "/chats");
    }
}
