use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ErrorKind, RouteError};
use crate::logic::RouteOperations;
use crate::model::{ApiRequest, DeleteRouteRequest, RouteDocument, WriteAck};

pub type AppState = Arc<RouteOperations>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub docid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    pub namespace: Option<String>,
    pub basepath: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceQuery {
    pub namespace: Option<String>,
}

pub fn status_for(err: &RouteError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Transient => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: RouteError) -> ApiError {
    (status_for(&err), Json(ErrorResponse::new(&err.to_string())))
}

/// POST /routemgmt/deleteRoute
pub async fn delete_route(
    State(ops): State<AppState>,
    RequestJson(req): RequestJson<DeleteRouteRequest>,
) -> Result<Json<WriteAck>, ApiError> {
    ops.delete_route(&req).await.map(Json).map_err(error_response)
}

/// POST /routemgmt/updateApi
pub async fn update_api(
    State(ops): State<AppState>,
    RequestJson(req): RequestJson<ApiRequest>,
) -> Result<Json<WriteAck>, ApiError> {
    ops.update_api(req).await.map(Json).map_err(|e| {
        (
            status_for(&e),
            Json(ErrorResponse::new(&format!(
                "API configuration update failure: {}",
                e
            ))),
        )
    })
}

/// POST /routemgmt/createApi
pub async fn create_api(
    State(ops): State<AppState>,
    RequestJson(req): RequestJson<ApiRequest>,
) -> Result<(StatusCode, Json<WriteAck>), ApiError> {
    match ops.create_api(req).await {
        Ok(ack) => Ok((StatusCode::CREATED, Json(ack))),
        Err(e) => Err(error_response(e)),
    }
}

/// GET /routemgmt/getRoute?docid=
pub async fn get_route(
    State(ops): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteDocument>, ApiError> {
    let docid = query.docid.unwrap_or_default();
    ops.get_route(&docid).await.map(Json).map_err(error_response)
}

/// GET /routemgmt/getApi?namespace=&basepath=
pub async fn get_api(
    State(ops): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> Result<Json<RouteDocument>, ApiError> {
    let namespace = query.namespace.unwrap_or_default();
    let basepath = query.basepath.unwrap_or_default();
    ops.get_api(&namespace, &basepath)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /routemgmt/apis?namespace=
pub async fn list_apis(
    State(ops): State<AppState>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<ListResponse<RouteDocument>>, ApiError> {
    let namespace = query.namespace.unwrap_or_default();
    let items = ops.list_apis(&namespace).await.map_err(error_response)?;
    Ok(Json(ListResponse {
        total: items.len(),
        items,
    }))
}
