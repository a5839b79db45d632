use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::{Id, RouteDocument, WriteAck};
use crate::store::revision::next_revision;
use crate::store::traits::{RouteDocStore, StoreResult};

#[derive(Debug, Clone)]
struct StoredDoc {
    rev: String,
    /// Persisted body, revision stripped.
    doc: RouteDocument,
}

/// In-process document store with the same revision semantics as
/// [`PostgresStore`](crate::store::PostgresStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<Id, StoredDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision of a document, if stored
    pub fn revision_of(&self, id: &str) -> Option<String> {
        self.docs.read().get(id).map(|stored| stored.rev.clone())
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait::async_trait]
impl RouteDocStore for MemoryStore {
    async fn get_doc(&self, id: &str) -> StoreResult<Option<RouteDocument>> {
        Ok(self.docs.read().get(id).map(|stored| RouteDocument {
            revision: Some(stored.rev.clone()),
            ..stored.doc.clone()
        }))
    }

    async fn put_doc(
        &self,
        doc: &RouteDocument,
        previous_rev: Option<&str>,
    ) -> StoreResult<WriteAck> {
        let body = doc.body();
        let bytes = serde_json::to_vec(&body)?;

        let mut docs = self.docs.write();
        match (docs.get(&doc.id), previous_rev) {
            (Some(_), None) => {
                return Err(StoreError::Conflict { id: doc.id.clone() });
            }
            (Some(stored), Some(prev)) if stored.rev != prev => {
                return Err(StoreError::Conflict { id: doc.id.clone() });
            }
            (None, Some(_)) => {
                return Err(StoreError::NotFound { id: doc.id.clone() });
            }
            _ => {}
        }

        let rev = next_revision(previous_rev, &bytes);
        docs.insert(
            doc.id.clone(),
            StoredDoc {
                rev: rev.clone(),
                doc: body,
            },
        );
        Ok(WriteAck::new(doc.id.clone(), rev))
    }

    async fn delete_doc(&self, id: &str, rev: &str) -> StoreResult<WriteAck> {
        let mut docs = self.docs.write();
        match docs.get(id) {
            None => Err(StoreError::NotFound { id: id.to_string() }),
            Some(stored) if stored.rev != rev => Err(StoreError::Conflict { id: id.to_string() }),
            Some(_) => {
                docs.remove(id);
                Ok(WriteAck::new(id, next_revision(Some(rev), b"")))
            }
        }
    }

    async fn list_docs(&self, namespace: &str) -> StoreResult<Vec<RouteDocument>> {
        let docs = self.docs.read();
        let mut listed: Vec<RouteDocument> = docs
            .values()
            .filter(|stored| stored.doc.namespace == namespace)
            .map(|stored| RouteDocument {
                revision: Some(stored.rev.clone()),
                ..stored.doc.clone()
            })
            .collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApiDoc;

    fn doc(namespace: &str, basepath: &str) -> RouteDocument {
        RouteDocument::new(namespace, ApiDoc::new("test", basepath))
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let ack = store.put_doc(&doc("guest", "/v1"), None).await.unwrap();
        assert!(ack.ok);
        assert_eq!(ack.id, "API:guest:/v1");

        let stored = store.get_doc("API:guest:/v1").await.unwrap().unwrap();
        assert_eq!(stored.revision.as_deref(), Some(ack.rev.as_str()));
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = MemoryStore::new();
        store.put_doc(&doc("guest", "/v1"), None).await.unwrap();
        let err = store.put_doc(&doc("guest", "/v1"), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts_and_leaves_document() {
        let store = MemoryStore::new();
        let first = store.put_doc(&doc("guest", "/v1"), None).await.unwrap();
        let second = store
            .put_doc(&doc("guest", "/v1"), Some(&first.rev))
            .await
            .unwrap();

        let err = store
            .put_doc(&doc("guest", "/v1"), Some(&first.rev))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.revision_of("API:guest:/v1"), Some(second.rev));
    }

    #[tokio::test]
    async fn test_update_of_missing_document() {
        let store = MemoryStore::new();
        let err = store
            .put_doc(&doc("guest", "/v1"), Some("1-abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_requires_current_revision() {
        let store = MemoryStore::new();
        let ack = store.put_doc(&doc("guest", "/v1"), None).await.unwrap();

        let err = store.delete_doc("API:guest:/v1", "9-stale").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.len(), 1);

        store.delete_doc("API:guest:/v1", &ack.rev).await.unwrap();
        assert!(store.is_empty());

        let err = store.delete_doc("API:guest:/v1", &ack.rev).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        store.put_doc(&doc("guest", "/v2"), None).await.unwrap();
        store.put_doc(&doc("guest", "/v1"), None).await.unwrap();
        store.put_doc(&doc("other", "/v1"), None).await.unwrap();

        let ids: Vec<_> = store
            .list_docs("guest")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["API:guest:/v1", "API:guest:/v2"]);
    }
}
