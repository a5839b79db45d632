use std::sync::Arc;

use crate::error::LookupError;
use crate::lookup::traits::{ApiDocFetcher, LookupResult, RevisionResolver};
use crate::model::{api_doc_id, RouteDocument};
use crate::store::RouteDocStore;

/// Answers revision and document lookups straight from a store, for
/// deployments without a separate read service.
#[derive(Clone)]
pub struct StoreLookup {
    store: Arc<dyn RouteDocStore>,
}

impl StoreLookup {
    pub fn new(store: Arc<dyn RouteDocStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl RevisionResolver for StoreLookup {
    async fn current_revision(&self, docid: &str) -> LookupResult<String> {
        self.store
            .get_doc(docid)
            .await?
            .and_then(|doc| doc.revision)
            .ok_or_else(|| LookupError::NotFound(format!("Route {} was not located", docid)))
    }
}

#[async_trait::async_trait]
impl ApiDocFetcher for StoreLookup {
    async fn fetch_api_doc(&self, namespace: &str, basepath: &str) -> LookupResult<RouteDocument> {
        self.store
            .get_doc(&api_doc_id(namespace, basepath))
            .await?
            .filter(|doc| doc.revision.is_some())
            .ok_or_else(|| {
                LookupError::NotFound(format!(
                    "Document for basepath \"{}\" was not located",
                    basepath
                ))
            })
    }
}
