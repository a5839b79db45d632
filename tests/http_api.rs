use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use routemgmt::config::AppConfig;
use routemgmt::error::{ErrorKind, LookupError};
use routemgmt::lookup::{ApiDocFetcher, HttpLookup, RevisionResolver, StoreLookup};
use routemgmt::model::DeleteRouteRequest;
use routemgmt::store::{MemoryStore, RouteDocStore};
use routemgmt::{build_app, build_operations, RouteOperations};

fn ops_over(store: Arc<MemoryStore>) -> RouteOperations {
    let lookup = Arc::new(StoreLookup::new(store.clone()));
    RouteOperations::new(store, lookup.clone(), lookup)
}

fn app_over(store: Arc<MemoryStore>) -> axum::Router {
    build_app(ops_over(store), &AppConfig::default())
}

fn create_body(relpath: &str, action_name: &str) -> Value {
    json!({
        "namespace": "guest",
        "basepath": "/v1",
        "relpath": relpath,
        "operation": "GET",
        "apiname": "Orders",
        "action": {
            "backendMethod": "POST",
            "backendUrl": format!("https://wsk.example.com/api/v1/namespaces/guest/actions/{}", action_name),
            "name": action_name,
            "namespace": "guest",
            "authkey": "uuid:key"
        }
    })
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app_over(Arc::new(MemoryStore::new()));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_route_lifecycle_over_http() {
    let store = Arc::new(MemoryStore::new());
    let app = app_over(store.clone());

    let (status, created) = send(&app, "POST", "/routemgmt/createApi", Some(create_body("/order", "create"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], json!("API:guest:/v1"));

    let (status, updated) = send(&app, "POST", "/routemgmt/updateApi", Some(create_body("/order", "update"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(updated["rev"], created["rev"]);

    let (status, doc) = send(
        &app,
        "GET",
        "/routemgmt/getApi?namespace=guest&basepath=%2Fv1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["_rev"], updated["rev"]);
    assert_eq!(doc["apidoc"]["info"]["title"], json!("Orders"));
    assert_eq!(
        doc["apidoc"]["paths"]["/order"]["GET"]["x-ibm-op-ext"]["actionName"],
        json!("update")
    );

    let (status, listed) = send(&app, "GET", "/routemgmt/apis?namespace=guest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], json!(1));

    let (status, deleted) = send(
        &app,
        "POST",
        "/routemgmt/deleteRoute",
        Some(json!({"docid": "API:guest:/v1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["ok"], json!(true));
    assert!(store.is_empty());

    let (status, body) = send(
        &app,
        "GET",
        "/routemgmt/getRoute?docid=API%3Aguest%3A%2Fv1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not located"));
}

#[tokio::test]
async fn test_error_statuses() {
    let store = Arc::new(MemoryStore::new());
    let app = app_over(store.clone());

    let mut both = create_body("/order", "a");
    both["swagger"] = json!({"basePath": "/v1"});
    let (status, body) = send(&app, "POST", "/routemgmt/updateApi", Some(both)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mutually exclusive"));

    let (status, body) = send(&app, "POST", "/routemgmt/updateApi", Some(create_body("/order", "a"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("API configuration update failure"));

    send(&app, "POST", "/routemgmt/createApi", Some(create_body("/order", "a"))).await;
    let (status, body) = send(&app, "POST", "/routemgmt/updateApi", Some(create_body("/foo", "a"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("path/operation /foo/GET does not exist in basepath /v1"));

    let (status, _) = send(&app, "POST", "/routemgmt/createApi", Some(create_body("/order", "a"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/routemgmt/deleteRoute", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("docid is required."));
}

/// Serve `store` on an ephemeral port and return its base URL.
async fn serve_read_service(store: Arc<MemoryStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_over(store);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_lookup_against_read_service() {
    let store = Arc::new(MemoryStore::new());
    let base_url = serve_read_service(store.clone()).await;
    let lookup = HttpLookup::new(base_url, Duration::from_secs(5)).unwrap();

    match lookup.current_revision("API:guest:/v1").await {
        Err(LookupError::NotFound(msg)) => assert!(msg.contains("not located")),
        other => panic!("unexpected lookup result: {:?}", other),
    }

    let ops = ops_over(store.clone());
    let ack = ops
        .create_api(serde_json::from_value(create_body("/order", "a")).unwrap())
        .await
        .unwrap();

    assert_eq!(lookup.current_revision("API:guest:/v1").await.unwrap(), ack.rev);
    let fetched = lookup.fetch_api_doc("guest", "/v1").await.unwrap();
    assert_eq!(fetched.revision, Some(ack.rev));
    assert_eq!(fetched, store.get_doc("API:guest:/v1").await.unwrap().unwrap());
}

#[tokio::test]
async fn test_mutations_resolved_through_remote_reads() {
    let store = Arc::new(MemoryStore::new());
    let base_url = serve_read_service(store.clone()).await;
    let lookup = Arc::new(HttpLookup::new(base_url, Duration::from_secs(5)).unwrap());
    let ops = RouteOperations::new(store.clone(), lookup.clone(), lookup);

    ops.create_api(serde_json::from_value(create_body("/order", "a")).unwrap())
        .await
        .unwrap();
    let ack = ops
        .update_api(serde_json::from_value(create_body("/order", "b")).unwrap())
        .await
        .unwrap();
    assert_eq!(store.revision_of("API:guest:/v1"), Some(ack.rev));

    ops.delete_route(&DeleteRouteRequest {
        docid: Some("API:guest:/v1".to_string()),
    })
    .await
    .unwrap();
    assert!(store.is_empty());

    let err = ops
        .delete_route(&DeleteRouteRequest {
            docid: Some("API:guest:/v1".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unreachable_read_service_is_transient() {
    let store = Arc::new(MemoryStore::new());
    // Bind then drop so nothing listens on the port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let lookup = Arc::new(HttpLookup::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap());
    let ops = RouteOperations::new(store, lookup.clone(), lookup);

    let err = ops
        .delete_route(&DeleteRouteRequest {
            docid: Some("API:guest:/v1".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
}

/// Read service whose getRoute answers with a route-level document rather
/// than an API document.
async fn serve_route_level_docs() -> String {
    use axum::routing::get;
    use axum::Json;

    let app = axum::Router::new().route(
        "/routemgmt/getRoute",
        get(|| async {
            Json(json!({
                "_id": "ns:get:/v1/order",
                "_rev": "3-abc",
                "gatewayPath": "/v1/order"
            }))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_revision_lookup_reads_only_rev() {
    let base_url = serve_route_level_docs().await;
    let lookup = HttpLookup::new(base_url, Duration::from_secs(5)).unwrap();

    assert_eq!(
        lookup.current_revision("ns:get:/v1/order").await.unwrap(),
        "3-abc"
    );
}

#[tokio::test]
async fn test_delete_of_route_level_document_uses_its_revision() {
    let base_url = serve_route_level_docs().await;
    let lookup = Arc::new(HttpLookup::new(base_url, Duration::from_secs(5)).unwrap());
    let store = Arc::new(MemoryStore::new());
    let ops = RouteOperations::new(store, lookup.clone(), lookup);

    // The local store holds nothing under that id, so the delete reaches the
    // store with the remote revision and is reported as not found there.
    let err = ops
        .delete_route(&DeleteRouteRequest {
            docid: Some("ns:get:/v1/order".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_server_wired_from_default_config() {
    let config = AppConfig::default();
    let ops = build_operations(&config).await.unwrap();
    assert_eq!(ops.call_timeout(), config.call_timeout());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(ops, &config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let created = client
        .post(format!("http://{}/routemgmt/createApi", addr))
        .json(&create_body("/order", "a"))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], json!("healthy"));
}
