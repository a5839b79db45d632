use crate::error::StoreError;
use crate::model::{RouteDocument, WriteAck};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence gateway for API documents. Every mutation is conditional on
/// the revision the caller last read.
#[async_trait::async_trait]
pub trait RouteDocStore: Send + Sync {
    /// Get a document by id, with its current revision filled in
    async fn get_doc(&self, id: &str) -> StoreResult<Option<RouteDocument>>;

    /// Write `doc` under `doc.id`.
    ///
    /// With `previous_rev = None` the document is created and the call fails
    /// with `Conflict` if the id is taken. Otherwise the stored revision must
    /// equal `previous_rev`.
    async fn put_doc(&self, doc: &RouteDocument, previous_rev: Option<&str>)
        -> StoreResult<WriteAck>;

    /// Delete a document whose stored revision equals `rev`
    async fn delete_doc(&self, id: &str, rev: &str) -> StoreResult<WriteAck>;

    /// List the documents of a namespace, ordered by id
    async fn list_docs(&self, namespace: &str) -> StoreResult<Vec<RouteDocument>>;
}
