use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LookupError, RouteError, StoreError};
use crate::logic::merge::ApiDocMerger;
use crate::logic::validate::{validate_api_request, validate_delete};
use crate::lookup::{ApiDocFetcher, RevisionResolver};
use crate::model::{api_doc_id, ApiChange, ApiRequest, ApiUpdate, DeleteRouteRequest, RouteDocument, WriteAck};
use crate::store::RouteDocStore;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry point for every route operation.
///
/// Remote calls within one operation are issued strictly one after another:
/// the write always uses the revision returned by the read just before it.
/// Nothing is retried; a lost race surfaces as a conflict.
#[derive(Clone)]
pub struct RouteOperations {
    store: Arc<dyn RouteDocStore>,
    revisions: Arc<dyn RevisionResolver>,
    fetcher: Arc<dyn ApiDocFetcher>,
    call_timeout: Duration,
}

impl RouteOperations {
    pub fn new(
        store: Arc<dyn RouteDocStore>,
        revisions: Arc<dyn RevisionResolver>,
        fetcher: Arc<dyn ApiDocFetcher>,
    ) -> Self {
        Self {
            store,
            revisions,
            fetcher,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound every remote call by `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    async fn bounded<T>(&self, call: &str, fut: impl Future<Output = T>) -> Result<T, RouteError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| {
                log::error!("{} timed out after {:?}", call, self.call_timeout);
                RouteError::Transient {
                    context: call.to_string(),
                    message: format!("timed out after {}ms", self.call_timeout.as_millis()),
                }
            })
    }

    /// Delete the whole document `docid` at its current revision.
    pub async fn delete_route(&self, req: &DeleteRouteRequest) -> Result<WriteAck, RouteError> {
        let docid = validate_delete(req)?;
        log::info!("deleteRoute doc id: {}", docid);

        let revision = match self
            .bounded("revision lookup", self.revisions.current_revision(&docid))
            .await?
        {
            Ok(rev) => rev,
            Err(LookupError::NotFound(reason)) => {
                log::error!("Could not obtain document revision; unable to delete document: {}", reason);
                return Err(RouteError::RouteNotFound { docid });
            }
            Err(e) => {
                log::error!("Could not obtain document revision; unable to delete document: {}", e);
                return Err(RouteError::transient(
                    format!("revision lookup for {} failed", docid),
                    e,
                ));
            }
        };
        log::info!("Document revision to delete: {}", revision);

        match self
            .bounded("document delete", self.store.delete_doc(&docid, &revision))
            .await?
        {
            Ok(ack) => {
                log::info!("Document deleted: {} {}", docid, revision);
                Ok(ack)
            }
            Err(e) => {
                log::error!("Document delete failed: {} {}: {}", docid, revision, e);
                Err(match e {
                    StoreError::Conflict { .. } => RouteError::StaleRevision { docid, revision },
                    StoreError::NotFound { .. } => RouteError::RouteNotFound { docid },
                    other => RouteError::transient(format!("delete of {} failed", docid), other),
                })
            }
        }
    }

    /// Update an existing API document: rebind one path/operation or replace
    /// the whole description from a swagger document.
    pub async fn update_api(&self, req: ApiRequest) -> Result<WriteAck, RouteError> {
        let update = validate_api_request(req)?;
        let docid = update.doc_id();
        log_update(&docid, &update);

        let existing = self.fetch_current(&update).await?;
        let merged = ApiDocMerger::merge(existing, &update, Utc::now()).map_err(|e| {
            log::error!("API configuration update failure: {}", e);
            e
        })?;
        let Some(revision) = merged.revision.clone() else {
            log::error!("_rev value not returned for {}", docid);
            return Err(RouteError::ApiNotFound {
                namespace: update.namespace,
                basepath: update.basepath,
            });
        };
        log::debug!(
            "API document ready to write to DB: {}",
            serde_json::to_string(&merged).unwrap_or_default()
        );

        match self
            .bounded("document write", self.store.put_doc(&merged, Some(&revision)))
            .await?
        {
            Ok(ack) => {
                log::info!("API document {} written at revision {}", ack.id, ack.rev);
                Ok(ack)
            }
            Err(e) => {
                log::error!("API configuration update failure: {}", e);
                Err(match e {
                    StoreError::Conflict { .. } => RouteError::StaleRevision { docid, revision },
                    StoreError::NotFound { .. } => RouteError::ApiNotFound {
                        namespace: update.namespace,
                        basepath: update.basepath,
                    },
                    other => RouteError::transient(format!("write of {} failed", docid), other),
                })
            }
        }
    }

    /// Register a new API document for a (namespace, basepath) pair.
    pub async fn create_api(&self, req: ApiRequest) -> Result<WriteAck, RouteError> {
        let update = validate_api_request(req)?;
        let doc = ApiDocMerger::initial(&update, Utc::now());
        log_update(&doc.id, &update);

        match self
            .bounded("document create", self.store.put_doc(&doc, None))
            .await?
        {
            Ok(ack) => {
                log::info!("API document {} created at revision {}", ack.id, ack.rev);
                Ok(ack)
            }
            Err(StoreError::Conflict { .. }) => Err(RouteError::ApiExists {
                namespace: update.namespace,
                basepath: update.basepath,
            }),
            Err(e) => Err(RouteError::transient(format!("create of {} failed", doc.id), e)),
        }
    }

    /// Read a document by id, revision included.
    pub async fn get_route(&self, docid: &str) -> Result<RouteDocument, RouteError> {
        if docid.is_empty() {
            return Err(RouteError::validation("docid is required."));
        }
        self.bounded("document read", self.store.get_doc(docid))
            .await?
            .map_err(|e| RouteError::transient(format!("read of {} failed", docid), e))?
            .ok_or_else(|| RouteError::RouteNotFound {
                docid: docid.to_string(),
            })
    }

    /// Read the API document of a (namespace, basepath) pair.
    pub async fn get_api(&self, namespace: &str, basepath: &str) -> Result<RouteDocument, RouteError> {
        if namespace.is_empty() {
            return Err(RouteError::validation("namespace is required."));
        }
        if basepath.is_empty() {
            return Err(RouteError::validation("basepath is required."));
        }
        let docid = api_doc_id(namespace, basepath);
        self.bounded("document read", self.store.get_doc(&docid))
            .await?
            .map_err(|e| RouteError::transient(format!("read of {} failed", docid), e))?
            .ok_or_else(|| RouteError::ApiNotFound {
                namespace: namespace.to_string(),
                basepath: basepath.to_string(),
            })
    }

    pub async fn list_apis(&self, namespace: &str) -> Result<Vec<RouteDocument>, RouteError> {
        if namespace.is_empty() {
            return Err(RouteError::validation("namespace is required."));
        }
        self.bounded("document list", self.store.list_docs(namespace))
            .await?
            .map_err(|e| RouteError::transient(format!("listing namespace {} failed", namespace), e))
    }

    /// Fetch the stored document the update applies to. `None` when the read
    /// service does not know it.
    async fn fetch_current(&self, update: &ApiUpdate) -> Result<Option<RouteDocument>, RouteError> {
        log::debug!(
            "Fetching API document for namespace:basepath {}:{}",
            update.namespace,
            update.basepath
        );
        match self
            .bounded(
                "document fetch",
                self.fetcher.fetch_api_doc(&update.namespace, &update.basepath),
            )
            .await?
        {
            Ok(doc) if doc.id != update.doc_id() => Err(RouteError::Transient {
                context: "document fetch".to_string(),
                message: format!("expected document {}, got {}", update.doc_id(), doc.id),
            }),
            Ok(doc) => Ok(Some(doc)),
            Err(LookupError::NotFound(reason)) => {
                log::warn!("{}", reason);
                Ok(None)
            }
            Err(e) => {
                log::error!("Got DB error: {}", e);
                Err(RouteError::transient(
                    format!("fetch of API document {} failed", update.doc_id()),
                    e,
                ))
            }
        }
    }
}

fn log_update(docid: &str, update: &ApiUpdate) {
    log::info!("docid               : {}", docid);
    log::info!("namespace           : {}", update.namespace);
    log::info!("basepath            : {}", update.basepath);
    match &update.change {
        ApiChange::Path {
            relpath,
            operation,
            action,
        } => {
            log::info!("relpath             : {}", relpath);
            log::info!("operation           : {}", operation);
            log::info!("action name         : {}", action.name);
            log::info!("action namespace    : {}", action.namespace);
            log::info!("action backendMethod: {}", action.backend_method);
            log::info!("action backendUrl   : {}", action.backend_url);
        }
        ApiChange::Swagger(apidoc) => {
            log::info!("swagger paths       : {}", apidoc.paths.len());
        }
    }
}
