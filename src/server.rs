//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every endpoint to its handler and returns a
//! ready-to-serve [`axum::Router`].
//!
//! `GET /get` doubles as list-all and get-by-id depending on the query
//! string, and the query form is strict: any parameter other than `id` is
//! rejected. Dispatch happens here so the handlers stay plain functions.

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::{generate_request_id, ApiError};
use crate::handlers::message;
use crate::handlers::message::MessagePayload;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the Postbox API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Postbox API",
        version = "0.1.0",
        description = "Message CRUD API backed by DynamoDB and S3"
    ),
    paths(
        health_check,
        crate::handlers::message::list_messages,
        crate::handlers::message::get_message,
        crate::handlers::message::create_message,
        crate::handlers::message::update_message,
        crate::handlers::message::delete_message,
    ),
    tags(
        (name = "Health", description = "Health and readiness probes"),
        (name = "Message", description = "Message CRUD operations"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Probes and observability (not part of the message API).
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_spec))
        // Message API.
        .route("/", get(home))
        .route("/get", get(handle_get_messages))
        .route("/get/:id", get(handle_get_message_by_path))
        .route("/post", post(handle_post_message))
        .route("/put/:id", put(handle_put_message))
        .route("/delete", delete(handle_delete_by_query))
        .route("/delete/:id", delete(handle_delete_by_path))
        // Application state shared across all handlers.
        .with_state(state)
        // request_id_middleware is innermost (runs after routing).
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // metrics_middleware is outermost (captures the full lifecycle).
        .layer(middleware::from_fn(metrics_middleware))
}

// -- Request-id middleware -----------------------------------------------------

/// Middleware that stamps every response with an `x-request-id` header
/// unless a handler already set one.
async fn request_id_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-request-id", value);
        }
    }

    response
}

// -- Probes --------------------------------------------------------------------

/// `GET /healthz` -- liveness probe, always 200.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Process is alive")
    )
)]
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

/// `GET /readyz` -- readiness probe.
///
/// Reports 503 until both storage containers have been provisioned, so a
/// half-provisioned instance can be detected before traffic is routed.
async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.is_ready() {
        (
            StatusCode::OK,
            [("content-type", "application/json")],
            r#"{"status":"ready"}"#,
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "application/json")],
            r#"{"status":"provisioning"}"#,
        )
    }
}

/// `GET /openapi.json` -- serve the OpenAPI document.
async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// `GET /` -- plain text greeting.
async fn home() -> impl IntoResponse {
    "Hello World!"
}

// -- Query parameter parsing helper ------------------------------------------

/// Parse a raw query string into a map, percent-decoding keys and values.
fn parse_query(raw: Option<String>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(qs) = raw {
        for part in qs.split('&') {
            if let Some((k, v)) = part.split_once('=') {
                let decoded_k = percent_encoding::percent_decode_str(k)
                    .decode_utf8_lossy()
                    .into_owned();
                let decoded_v = percent_encoding::percent_decode_str(v)
                    .decode_utf8_lossy()
                    .into_owned();
                map.insert(decoded_k, decoded_v);
            } else if !part.is_empty() {
                let decoded = percent_encoding::percent_decode_str(part)
                    .decode_utf8_lossy()
                    .into_owned();
                map.insert(decoded, String::new());
            }
        }
    }
    map
}

// -- Dispatch ------------------------------------------------------------------

/// `GET /get` -- dispatches on the query string:
/// - no parameters -> ListMessages
/// - exactly `?id=...` -> GetMessage
/// - anything else -> 400 Invalid parameters
async fn handle_get_messages(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let query = parse_query(raw_query);

    if query.is_empty() {
        return message::list_messages(state).await;
    }

    if query.len() == 1 {
        if let Some(id) = query.get("id") {
            return message::get_message(state, id).await;
        }
    }

    Err(ApiError::InvalidParameters)
}

/// `GET /get/:id` -- GetMessage by path segment.
async fn handle_get_message_by_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    message::get_message(state, &id).await
}

/// `POST /post` -- CreateMessage.
async fn handle_post_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MessagePayload>,
) -> Result<Response, ApiError> {
    message::create_message(state, payload).await
}

/// `PUT /put/:id` -- UpdateMessage.
async fn handle_put_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MessagePayload>,
) -> Result<Response, ApiError> {
    message::update_message(state, &id, payload).await
}

/// `DELETE /delete?id=<id>` -- DeleteMessage by query parameter.
/// The `id` parameter is required.
async fn handle_delete_by_query(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let query = parse_query(raw_query);

    match query.get("id") {
        Some(id) if !id.is_empty() => message::delete_message(state, id).await,
        _ => Err(ApiError::MissingId),
    }
}

/// `DELETE /delete/:id` -- DeleteMessage by path segment.
async fn handle_delete_by_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    message::delete_message(state, &id).await
}

// -- Tests ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::kv::memory::MemoryMessageStore;
    use crate::kv::store::KeyValueStore;
    use crate::objects::memory::MemoryObjectStore;
    use crate::objects::store::ObjectStore;
    use axum::body::Body;
    use axum::http::Request;
    use bytes::Bytes;
    use tower::util::ServiceExt;

    struct TestHarness {
        app: Router,
        state: Arc<AppState>,
        kv: Arc<MemoryMessageStore>,
        objects: Arc<MemoryObjectStore>,
    }

    fn harness() -> TestHarness {
        let kv = Arc::new(MemoryMessageStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let config: Config = serde_yaml::from_str("{}").unwrap();
        let state = Arc::new(AppState::new(config, kv.clone(), objects.clone()));
        state.set_ready(true);
        TestHarness {
            app: app(state.clone()),
            state,
            kv,
            objects,
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, req).await;
        let value = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_home_returns_greeting() {
        let h = harness();
        let (status, body) = send(&h.app, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"Hello World!");
    }

    #[tokio::test]
    async fn test_healthz() {
        let h = harness();
        let (status, body) = send_json(&h.app, empty_request("GET", "/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_readyz_reflects_provisioning() {
        let h = harness();
        h.state.set_ready(false);
        let (status, body) = send_json(&h.app, empty_request("GET", "/readyz")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "provisioning");

        h.state.set_ready(true);
        let (status, body) = send_json(&h.app, empty_request("GET", "/readyz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(empty_request("GET", "/healthz"))
            .await
            .unwrap();
        let request_id = response.headers().get("x-request-id").unwrap();
        assert_eq!(request_id.to_str().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_list_empty_returns_empty_array() {
        let h = harness();
        let (status, body) = send_json(&h.app, empty_request("GET", "/get")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_post_then_get_mirrors_both_stores() {
        let h = harness();

        let (status, body) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "Hello, Isha!"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "You sent: Hello, Isha!");
        let id = body["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        // Read back over HTTP by path and by query parameter.
        let (status, body) = send_json(&h.app, empty_request("GET", &format!("/get/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["message"], "Hello, Isha!");

        let (status, body) =
            send_json(&h.app, empty_request("GET", &format!("/get?id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Hello, Isha!");

        // Both stores hold the same text.
        let record = h.kv.get_message(&id).await.unwrap().unwrap();
        assert_eq!(record.message, "Hello, Isha!");
        let blob = h.objects.get(&format!("{id}.txt")).await.unwrap().unwrap();
        assert_eq!(&blob[..], b"Hello, Isha!");
    }

    #[tokio::test]
    async fn test_post_without_message_uses_placeholder() {
        let h = harness();
        let (status, body) =
            send_json(&h.app, json_request("POST", "/post", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "You sent: Say Hi to Isha!");
    }

    #[tokio::test]
    async fn test_post_generates_unique_ids() {
        let h = harness();
        let (_, first) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "one"})),
        )
        .await;
        let (_, second) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "two"})),
        )
        .await;
        assert_ne!(first["id"], second["id"]);

        let (status, body) = send_json(&h.app, empty_request("GET", "/get")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_404() {
        let h = harness();
        for uri in ["/get/nonexistent", "/get?id=nonexistent"] {
            let (status, body) = send_json(&h.app, empty_request("GET", uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Message not found");
        }
    }

    #[tokio::test]
    async fn test_get_with_unknown_query_param_is_400() {
        let h = harness();
        let (status, body) = send_json(&h.app, empty_request("GET", "/get?incorrect=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid parameters");

        // An extra parameter alongside a valid id is rejected too.
        let (status, _) = send_json(&h.app, empty_request("GET", "/get?id=1&extra=2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_put_updates_message_and_mirror() {
        let h = harness();
        let (_, created) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "before"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &h.app,
            json_request(
                "PUT",
                &format!("/put/{id}"),
                serde_json::json!({"message": "after"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Yayy! Updated!");

        let record = h.kv.get_message(&id).await.unwrap().unwrap();
        assert_eq!(record.message, "after");
        let blob = h.objects.get(&format!("{id}.txt")).await.unwrap().unwrap();
        assert_eq!(&blob[..], b"after");
    }

    #[tokio::test]
    async fn test_put_unknown_id_is_404() {
        let h = harness();
        let (status, body) = send_json(
            &h.app,
            json_request("PUT", "/put/unknown-id", serde_json::json!({"message": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");
    }

    #[tokio::test]
    async fn test_put_without_message_is_400() {
        let h = harness();
        let (_, created) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "keep"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &h.app,
            json_request("PUT", &format!("/put/{id}"), serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Oops! No message has been provided!");

        // The record is untouched.
        let record = h.kv.get_message(&id).await.unwrap().unwrap();
        assert_eq!(record.message, "keep");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_404() {
        let h = harness();
        let (_, created) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "bye"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) =
            send_json(&h.app, empty_request("DELETE", &format!("/delete/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Yayy! Message deleted!");

        let (status, _) = send_json(&h.app, empty_request("GET", &format!("/get/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The blob mirror is gone too.
        assert_eq!(h.objects.get(&format!("{id}.txt")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_by_query_param() {
        let h = harness();
        let (_, created) = send_json(
            &h.app,
            json_request("POST", "/post", serde_json::json!({"message": "bye"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) =
            send_json(&h.app, empty_request("DELETE", &format!("/delete?id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.kv.get_message(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_404() {
        let h = harness();
        let (status, body) =
            send_json(&h.app, empty_request("DELETE", "/delete/nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");
    }

    #[tokio::test]
    async fn test_delete_without_id_param_is_400() {
        let h = harness();
        let (status, body) = send_json(&h.app, empty_request("DELETE", "/delete")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ID parameter is required");
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let h = harness();
        let (status, body) = send_json(&h.app, empty_request("GET", "/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "Postbox API");
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query(Some("id=1&name=a%20b".to_string()));
        assert_eq!(query.get("id").map(String::as_str), Some("1"));
        assert_eq!(query.get("name").map(String::as_str), Some("a b"));

        let query = parse_query(Some("flag".to_string()));
        assert_eq!(query.get("flag").map(String::as_str), Some(""));

        assert!(parse_query(None).is_empty());
    }
}
