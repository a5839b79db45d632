use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Mutations
        .route("/routemgmt/deleteRoute", post(handlers::delete_route))
        .route("/routemgmt/updateApi", post(handlers::update_api))
        .route("/routemgmt/createApi", post(handlers::create_api))
        // Read service, also used as the sibling lookup by other deployments
        .route("/routemgmt/getRoute", get(handlers::get_route))
        .route("/routemgmt/getApi", get(handlers::get_api))
        .route("/routemgmt/apis", get(handlers::list_apis))
}
