pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod lookup;
pub mod model;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{ErrorKind, LookupError, RouteError, StoreError};

// Export logic types
pub use logic::{validate_api_request, validate_delete, ApiDocMerger, RouteOperations};

// Export all model types
pub use model::*;

// Export store and lookup types
pub use lookup::{ApiDocFetcher, HttpLookup, RevisionResolver, StoreLookup};
pub use store::{MemoryStore, PostgresStore, RouteDocStore};

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

/// Wire the store and lookup collaborators described by `config`.
pub async fn build_operations(config: &AppConfig) -> anyhow::Result<RouteOperations> {
    let store: Arc<dyn RouteDocStore> = match config.database.backend {
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; documents are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let postgres_store =
                PostgresStore::new(&database_url, config.database.max_connections.unwrap_or(20))
                    .await?;
            postgres_store.migrate().await?;
            Arc::new(postgres_store)
        }
    };

    let ops = match &config.lookup.base_url {
        Some(base_url) => {
            log::info!("Resolving documents through read service at {}", base_url);
            let lookup = Arc::new(HttpLookup::new(base_url.clone(), config.call_timeout())?);
            RouteOperations::new(store, lookup.clone(), lookup)
        }
        None => {
            let lookup = Arc::new(StoreLookup::new(store.clone()));
            RouteOperations::new(store, lookup.clone(), lookup)
        }
    };

    Ok(ops.with_call_timeout(config.call_timeout()))
}

/// The HTTP application for `ops`, bounded by the configured request timeout.
pub fn build_app(ops: RouteOperations, config: &AppConfig) -> axum::Router {
    let middleware = tower::ServiceBuilder::new()
        .layer(tower_http::timeout::TimeoutLayer::new(config.request_timeout()));

    routes::create_router()
        .layer(middleware)
        .with_state(Arc::new(ops))
}
