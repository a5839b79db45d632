use chrono::{DateTime, Utc};

use crate::error::RouteError;
use crate::model::{ApiChange, ApiDoc, ApiUpdate, OperationEntry, RouteDocument};

/// Computes the next state of an API document from a validated request.
///
/// Nothing here touches the store: the returned document is unsaved and still
/// carries the revision it was read at.
pub struct ApiDocMerger;

impl ApiDocMerger {
    /// Apply `update` to the stored document.
    ///
    /// A path update requires the (relpath, operation) pair to already exist;
    /// it replaces that one binding and leaves every other operation alone.
    /// A swagger update replaces the whole API description.
    pub fn merge(
        existing: Option<RouteDocument>,
        update: &ApiUpdate,
        now: DateTime<Utc>,
    ) -> Result<RouteDocument, RouteError> {
        let Some(mut doc) = existing else {
            return Err(RouteError::ApiNotFound {
                namespace: update.namespace.clone(),
                basepath: update.basepath.clone(),
            });
        };

        match &update.change {
            ApiChange::Path {
                relpath,
                operation,
                action,
            } => {
                let Some(current) = doc.operation(relpath, operation) else {
                    log::error!(
                        "path/operation {}/{} does not exist in basepath {}",
                        relpath,
                        operation,
                        update.basepath
                    );
                    return Err(RouteError::PathOperationMissing {
                        basepath: update.basepath.clone(),
                        relpath: relpath.clone(),
                        operation: operation.clone(),
                    });
                };
                log::info!(
                    "Replacing relpath/operation ({}/{}) in document {}",
                    relpath,
                    operation,
                    doc.id
                );
                log::debug!(
                    "Old relpath/operation configuration: {}",
                    serde_json::to_string(current).unwrap_or_default()
                );
                doc.apidoc
                    .set_operation(relpath, operation, OperationEntry::for_action(action));
            }
            ApiChange::Swagger(apidoc) => {
                log::info!("Replacing API configuration of document {}", doc.id);
                doc.apidoc = apidoc.clone();
            }
        }

        doc.updated_at = Some(now);
        Ok(doc)
    }

    /// Build the first document for a (namespace, basepath) pair.
    pub fn initial(update: &ApiUpdate, now: DateTime<Utc>) -> RouteDocument {
        let apidoc = match &update.change {
            ApiChange::Path {
                relpath,
                operation,
                action,
            } => {
                let title = update.apiname.clone().unwrap_or_else(|| update.basepath.clone());
                let mut apidoc = ApiDoc::new(title, update.basepath.clone());
                apidoc.set_operation(relpath, operation, OperationEntry::for_action(action));
                apidoc
            }
            ApiChange::Swagger(apidoc) => apidoc.clone(),
        };

        let mut doc = RouteDocument::new(update.namespace.clone(), apidoc);
        doc.updated_at = Some(now);
        doc
    }
}
