//! Document store
//!
//! The seam to the hosted document database. Records live in per-project
//! collections (`files/{projectId}/items`, `folders/{projectId}/items`) and
//! are exchanged as JSON documents.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::error::StoreError;

pub use memory::MemoryDocumentStore;

pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Files,
    Folders,
}

impl CollectionKind {
    fn root(&self) -> &'static str {
        match self {
            CollectionKind::Files => "files",
            CollectionKind::Folders => "folders",
        }
    }
}

/// Address of a per-project collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub kind: CollectionKind,
    pub project_id: String,
}

impl CollectionRef {
    pub fn files(project_id: &str) -> Self {
        Self {
            kind: CollectionKind::Files,
            project_id: project_id.to_string(),
        }
    }

    pub fn folders(project_id: &str) -> Self {
        Self {
            kind: CollectionKind::Folders,
            project_id: project_id.to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!("{}/{}/items", self.kind.root(), self.project_id)
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters plus an optional ordering
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// Sort matched documents in place; ties fall back to document id
    pub fn sort(&self, results: &mut [(String, Document)]) {
        if let Some((field, direction)) = &self.order_by {
            results.sort_by(|(a_id, a), (b_id, b)| {
                let ordering = compare_values(a.get(field), b.get(field)).then_with(|| a_id.cmp(b_id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// What a batched write does to its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Create or overwrite
    Set,
    /// Merge fields into an existing document
    Update,
    Delete,
}

/// A single write inside a batch
#[derive(Debug, Clone)]
pub struct BatchWrite {
    pub kind: WriteKind,
    pub collection: CollectionRef,
    pub id: String,
    pub fields: Document,
}

/// Writes applied all-or-nothing, in order, by [`DocumentStore::commit`]
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: WriteKind, collection: &CollectionRef, id: &str, fields: Document) {
        self.writes.push(BatchWrite {
            kind,
            collection: collection.clone(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn set(&mut self, collection: &CollectionRef, id: &str, doc: Document) {
        self.push(WriteKind::Set, collection, id, doc);
    }

    pub fn update(&mut self, collection: &CollectionRef, id: &str, fields: Document) {
        self.push(WriteKind::Update, collection, id, fields);
    }

    pub fn delete(&mut self, collection: &CollectionRef, id: &str) {
        self.push(WriteKind::Delete, collection, id, Document::new());
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<BatchWrite> {
        self.writes
    }
}

/// Hosted document database operations used by the file service.
///
/// Each call is a single round trip. Only `commit` spans several documents,
/// and it is atomic for its own batch only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or overwrite a document (last write wins)
    async fn set(&self, collection: &CollectionRef, id: &str, doc: Document) -> Result<(), StoreError>;

    async fn get(&self, collection: &CollectionRef, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge fields into an existing document; fails with `NotFound` if absent
    async fn update(&self, collection: &CollectionRef, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Remove a document; absent documents are not an error
    async fn delete(&self, collection: &CollectionRef, id: &str) -> Result<(), StoreError>;

    async fn query(&self, collection: &CollectionRef, query: &Query) -> Result<Vec<(String, Document)>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Serialize a record into a document
pub fn encode<T: Serialize>(id: &str, record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Malformed {
            id: id.to_string(),
            source: serde::ser::Error::custom("record did not serialize to an object"),
        }),
        Err(source) => Err(StoreError::Malformed {
            id: id.to_string(),
            source,
        }),
    }
}

/// Deserialize a stored document into a record
pub fn decode<T: DeserializeOwned>(id: &str, doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|source| StoreError::Malformed {
        id: id.to_string(),
        source,
    })
}

/// Single-field document, used for path rewrites
pub fn single_field(field: &str, value: impl Into<Value>) -> Document {
    let mut doc = Document::new();
    doc.insert(field.to_string(), value.into());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn collection_paths() {
        assert_eq!(CollectionRef::files("p1").path(), "files/p1/items");
        assert_eq!(CollectionRef::folders("p1").to_string(), "folders/p1/items");
    }

    #[test]
    fn query_matches_all_filters() {
        let query = Query::new().where_eq("path", "/").where_eq("source", "manual");
        assert!(query.matches(&doc(json!({"path": "/", "source": "manual"}))));
        assert!(!query.matches(&doc(json!({"path": "/", "source": "chat"}))));
        assert!(!query.matches(&doc(json!({"source": "manual"}))));
    }

    #[test]
    fn query_sorts_descending_by_number() {
        let query = Query::new().order_by("createdAt", Direction::Descending);
        let mut results = vec![
            ("a".to_string(), doc(json!({"createdAt": 1}))),
            ("b".to_string(), doc(json!({"createdAt": 3}))),
            ("c".to_string(), doc(json!({"createdAt": 2}))),
        ];
        query.sort(&mut results);
        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }
}
