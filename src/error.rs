//! Error types for route management.
//!
//! Three layers: [`StoreError`] comes out of the persistence gateway,
//! [`LookupError`] out of the read-side collaborators, and [`RouteError`] is
//! what callers of the orchestrator see.

use thiserror::Error;

/// Errors reported by a [`RouteDocStore`](crate::store::RouteDocStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document is stored under the id.
    #[error("document {id} not found")]
    NotFound { id: String },

    /// The supplied revision is no longer the stored one, or a create hit an
    /// existing id.
    #[error("document update conflict on {id}")]
    Conflict { id: String },

    /// Connectivity, authentication or query failure.
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),

    /// The document could not be encoded or decoded.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by the revision resolver and document fetcher.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The looked-up document does not exist or carries no revision.
    #[error("{0}")]
    NotFound(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The read service answered with a non-success status.
    #[error("lookup error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The read service answered with a body that is not a route document.
    #[error("failed to decode lookup response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid read service URL.
    #[error("invalid lookup URL: {0}")]
    InvalidUrl(String),

    /// The in-process lookup hit a store failure.
    #[error("lookup store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LookupError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => LookupError::NotFound(format!("Route {} was not located", id)),
            other => LookupError::Store(other),
        }
    }
}

/// Broad classification of a [`RouteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Transient,
}

/// Caller-facing failure of a route operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    /// Missing or contradictory input. Raised before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error("Route {docid} was not located")]
    RouteNotFound { docid: String },

    #[error("API document for basepath \"{basepath}\" in namespace {namespace} was not found")]
    ApiNotFound { namespace: String, basepath: String },

    /// The update targets a path/operation the stored document does not have.
    #[error("path/operation {relpath}/{operation} does not exist in basepath {basepath}")]
    PathOperationMissing {
        basepath: String,
        relpath: String,
        operation: String,
    },

    #[error("API document for basepath \"{basepath}\" in namespace {namespace} already exists")]
    ApiExists { namespace: String, basepath: String },

    /// The store rejected a write because the revision moved on.
    #[error("document {docid} was modified concurrently; revision {revision} is stale")]
    StaleRevision { docid: String, revision: String },

    /// A collaborator failed (network, auth, serialization, timeout).
    #[error("{context}: {message}")]
    Transient { context: String, message: String },
}

impl RouteError {
    pub fn validation(message: impl Into<String>) -> Self {
        RouteError::Validation(message.into())
    }

    pub fn transient(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RouteError::Transient {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::Validation(_) => ErrorKind::Validation,
            RouteError::RouteNotFound { .. } | RouteError::ApiNotFound { .. } => ErrorKind::NotFound,
            RouteError::PathOperationMissing { .. }
            | RouteError::ApiExists { .. }
            | RouteError::StaleRevision { .. } => ErrorKind::Conflict,
            RouteError::Transient { .. } => ErrorKind::Transient,
        }
    }
}
