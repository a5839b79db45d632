use crate::error::LookupError;
use crate::model::RouteDocument;

pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Read-only lookup of a document's current revision. One attempt per call.
#[async_trait::async_trait]
pub trait RevisionResolver: Send + Sync {
    async fn current_revision(&self, docid: &str) -> LookupResult<String>;
}

/// Read-only fetch of the full API document for a (namespace, basepath) pair.
/// The returned document always carries its revision.
#[async_trait::async_trait]
pub trait ApiDocFetcher: Send + Sync {
    async fn fetch_api_doc(&self, namespace: &str, basepath: &str) -> LookupResult<RouteDocument>;
}
