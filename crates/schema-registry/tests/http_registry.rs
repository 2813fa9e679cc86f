//! Integration tests for the HTTP registry client
//!
//! A throwaway axum server plays the registry; the blocking client talks to
//! it over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use courier_avro::Value;
use courier_schema_registry::{
    HttpSchemaRegistry, RegistryConfig, RegistryError, RegistryErrorCode, SchemaCodecManager,
    SchemaRegistry, Subject,
};
use parking_lot::Mutex;
use serde_json::{Value as JsonValue, json};

const AUTH: &str = "Basic a2V5OnNlY3JldA==";

const ORDERS_VALUE: &str = r#"[{"type":"record","name":"created","fields":[{"name":"clusterId","type":"string"}]},{"type":"record","name":"cancelled","fields":[{"name":"clusterId","type":"string"}]}]"#;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Default)]
struct Recorded {
    paths: Vec<String>,
    bodies: Vec<JsonValue>,
}

type Shared = Arc<Mutex<Recorded>>;

fn error_body(status: StatusCode, code: i32, message: &str) -> Response {
    (status, Json(json!({"error_code": code, "message": message}))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == AUTH)
}

async fn schema_by_id(
    State(recorded): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u32>,
) -> Response {
    recorded.lock().paths.push(format!("/schemas/ids/{}", id));
    if !authorized(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, 40101, "Unauthorized");
    }
    match id {
        1 => Json(json!({"schema": ORDERS_VALUE})).into_response(),
        _ => error_body(StatusCode::NOT_FOUND, 40403, "Schema not found"),
    }
}

async fn subject_version(
    State(recorded): State<Shared>,
    Path((subject, version)): Path<(String, String)>,
) -> Response {
    recorded
        .lock()
        .paths
        .push(format!("/subjects/{}/versions/{}", subject, version));
    match (subject.as_str(), version.as_str()) {
        ("orders-value", "latest" | "3") => Json(json!({
            "subject": "orders-value",
            "id": 1,
            "version": 3,
            "schema": ORDERS_VALUE,
        }))
        .into_response(),
        ("orders-value", _) => error_body(StatusCode::NOT_FOUND, 40402, "Version not found."),
        _ => error_body(StatusCode::NOT_FOUND, 40401, "Subject not found."),
    }
}

async fn register(
    State(recorded): State<Shared>,
    Path(subject): Path<String>,
    Json(body): Json<JsonValue>,
) -> Response {
    let mut recorded = recorded.lock();
    recorded.paths.push(format!("/subjects/{}/versions", subject));
    recorded.bodies.push(body);
    match subject.as_str() {
        "broken-value" => error_body(StatusCode::UNPROCESSABLE_ENTITY, 42201, "Invalid schema"),
        _ => Json(json!({"id": 7})).into_response(),
    }
}

async fn lookup(
    State(recorded): State<Shared>,
    Path(subject): Path<String>,
    Json(body): Json<JsonValue>,
) -> Response {
    let mut recorded = recorded.lock();
    recorded.paths.push(format!("/subjects/{}", subject));
    recorded.bodies.push(body);
    match subject.as_str() {
        "orders-value" => Json(json!({
            "subject": "orders-value",
            "id": 1,
            "version": 3,
            "schema": ORDERS_VALUE,
        }))
        .into_response(),
        "unknown-schema-value" => error_body(StatusCode::NOT_FOUND, 40403, "Schema not found"),
        "server-error-value" => error_body(StatusCode::INTERNAL_SERVER_ERROR, 50001, "Store error"),
        "garbage-value" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => error_body(StatusCode::NOT_FOUND, 40401, "Subject not found."),
    }
}

/// Start a registry on an ephemeral port, served from a helper thread with
/// its own runtime so the blocking client can run on the test thread.
fn spawn_registry() -> (String, Shared) {
    let recorded: Shared = Arc::default();
    let app = Router::new()
        .route("/schemas/ids/{id}", get(schema_by_id))
        .route("/subjects/{subject}/versions/{version}", get(subject_version))
        .route("/subjects/{subject}/versions", post(register))
        .route("/subjects/{subject}", post(lookup))
        .with_state(recorded.clone());

    let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = rx.recv().unwrap();
    (format!("http://{}", addr), recorded)
}

fn client(base_uri: &str) -> HttpSchemaRegistry {
    HttpSchemaRegistry::new(&RegistryConfig::new(base_uri).with_credentials("key", "secret")).unwrap()
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn test_get_schema_by_id() {
    let (uri, recorded) = spawn_registry();
    let registry = client(&uri);

    assert_eq!(registry.get_schema(1).unwrap(), ORDERS_VALUE);
    assert_eq!(recorded.lock().paths, vec!["/schemas/ids/1"]);
}

#[test]
fn test_basic_auth_is_sent() {
    let (uri, _) = spawn_registry();
    let registry =
        HttpSchemaRegistry::new(&RegistryConfig::new(&uri).with_credentials("key", "wrong")).unwrap();

    let err = registry.get_schema(1).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Api {
            code: RegistryErrorCode::Other(40101),
            ..
        }
    ));
}

#[test]
fn test_get_subject_schema_latest_and_pinned() {
    let (uri, recorded) = spawn_registry();
    let registry = client(&uri);
    let subject = Subject::of_value("orders");

    let latest = registry.get_subject_schema(&subject, None).unwrap();
    assert_eq!((latest.id, latest.version), (1, 3));
    assert_eq!(latest.subject, "orders-value");
    assert!(latest.is_union());

    let pinned = registry.get_subject_schema(&subject, Some(3)).unwrap();
    assert_eq!(pinned.id, 1);

    assert_eq!(
        recorded.lock().paths,
        vec![
            "/subjects/orders-value/versions/latest",
            "/subjects/orders-value/versions/3",
        ]
    );
}

#[test]
fn test_get_subject_schema_errors() {
    let (uri, _) = spawn_registry();
    let registry = client(&uri);

    let err = registry
        .get_subject_schema(&Subject::of_value("orders"), Some(9))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Api {
            code: RegistryErrorCode::VersionNotFound,
            ..
        }
    ));

    let err = registry
        .get_subject_schema(&Subject::of_value("payments"), None)
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_register_schema_posts_schema_text() {
    let (uri, recorded) = spawn_registry();
    let registry = client(&uri);

    let id = registry
        .register_schema(&Subject::of_value("orders"), ORDERS_VALUE)
        .unwrap();
    assert_eq!(id, 7);

    let recorded = recorded.lock();
    assert_eq!(recorded.paths, vec!["/subjects/orders-value/versions"]);
    assert_eq!(recorded.bodies, vec![json!({"schema": ORDERS_VALUE})]);
}

#[test]
fn test_register_schema_rejected() {
    let (uri, _) = spawn_registry();
    let err = client(&uri)
        .register_schema(&Subject::of_value("broken"), "{}")
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::api(RegistryErrorCode::InvalidSchema, "Invalid schema")
    );
}

#[test]
fn test_registered_schema_id_lookup() {
    let (uri, recorded) = spawn_registry();
    let registry = client(&uri);

    let id = registry
        .get_registered_schema_id(&Subject::of_value("orders"), ORDERS_VALUE)
        .unwrap();
    assert_eq!(id, Some(1));
    assert_eq!(recorded.lock().paths, vec!["/subjects/orders-value"]);
}

#[test]
fn test_registered_schema_id_not_found_is_none() {
    let (uri, _) = spawn_registry();
    let registry = client(&uri);

    for topic in ["payments", "unknown-schema"] {
        let id = registry
            .get_registered_schema_id(&Subject::of_value(topic), ORDERS_VALUE)
            .unwrap();
        assert_eq!(id, None, "topic {}", topic);
    }
}

#[test]
fn test_registered_schema_id_other_errors_propagate() {
    let (uri, _) = spawn_registry();
    let registry = client(&uri);

    let err = registry
        .get_registered_schema_id(&Subject::of_value("server-error"), ORDERS_VALUE)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::api(RegistryErrorCode::Server(50001), "Store error")
    );

    let err = registry
        .get_registered_schema_id(&Subject::of_value("garbage"), ORDERS_VALUE)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Parse(_)));
}

#[test]
fn test_network_failure() {
    let registry = client("http://127.0.0.1:1");
    assert!(matches!(registry.get_schema(1), Err(RegistryError::Network(_))));
}

// ============================================================================
// Codec manager over HTTP
// ============================================================================

#[test]
fn test_manager_round_trip_over_http() {
    let (uri, recorded) = spawn_registry();
    let manager = SchemaCodecManager::new(Arc::new(client(&uri)));

    let bytes = manager
        .encode(
            Value::from(json!({"clusterId": "abc"})),
            "orders",
            Some("cancelled"),
            None,
        )
        .unwrap();
    assert_eq!(&bytes[..6], &[0, 0, 0, 0, 1, 2]);

    let decoded = manager.decode(Some(bytes.as_slice())).unwrap().unwrap();
    assert_eq!(decoded.into_json(), json!({"clusterId": "abc"}));

    assert_eq!(
        recorded.lock().paths,
        vec!["/subjects/orders-value/versions/latest", "/schemas/ids/1"]
    );
}
