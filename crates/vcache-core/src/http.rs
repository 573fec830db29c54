//! HTTP responder.
//!
//! Serves snapshot content with a SHA-256 integrity tag. Request handling
//! only reads the in-memory snapshot store, so latency does not depend on
//! the health of the remote source.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use prometheus::Registry;
use sha2::{Digest, Sha256};
use tower_http::compression::CompressionLayer;
use tracing::{debug, error, info};

use crate::metrics::{encode_text, Metrics};
use crate::resolver::resolve;
use crate::store::SnapshotReader;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub reader: SnapshotReader,
    pub metrics: Metrics,
    pub registry: Registry,
}

impl AppState {
    pub fn new(reader: SnapshotReader, metrics: Metrics, registry: Registry) -> Self {
        Self {
            reader,
            metrics,
            registry,
        }
    }
}

/// Build the router: `/metrics` plus document serving for every other path.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .fallback(serve_document)
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Hex SHA-256 of `body`, used as the `ETag`.
pub fn content_tag(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Whether an `If-None-Match` header value matches `tag`.
fn if_none_match(value: &str, tag: &str) -> bool {
    value.split(',').any(|candidate| {
        let candidate = candidate.trim();
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate == "*" || candidate.trim_matches('"') == tag
    })
}

/// Peer address for logging, `"unknown"` when the server was not started
/// with connect info.
fn remote_addr(info: Option<ConnectInfo<SocketAddr>>) -> String {
    info.map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn serve_document(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path();
    let remote = remote_addr(connect_info);
    info!(%method, path, %remote, "request");
    for (name, value) in &headers {
        debug!(header = %name, value = ?value, "request header");
    }

    let Some(target) = resolve(path) else {
        state
            .metrics
            .record_http_request("other", method.as_str(), StatusCode::NOT_FOUND.as_u16());
        return not_found();
    };

    let Some(body) = state.reader.get(&target.key()) else {
        debug!(key = %target.key(), "no snapshot yet");
        state
            .metrics
            .record_http_request(path, method.as_str(), StatusCode::NOT_FOUND.as_u16());
        return not_found();
    };

    let tag = content_tag(&body);
    let cached = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| if_none_match(v, &tag));

    if cached {
        state
            .metrics
            .record_http_request(path, method.as_str(), StatusCode::NOT_MODIFIED.as_u16());
        return (StatusCode::NOT_MODIFIED, document_headers(tag)).into_response();
    }

    state
        .metrics
        .record_http_request(path, method.as_str(), StatusCode::OK.as_u16());
    (StatusCode::OK, document_headers(tag), body).into_response()
}

fn document_headers(tag: String) -> [(HeaderName, String); 3] {
    [
        (header::ETAG, tag),
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
    ]
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match encode_text(&state.registry) {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            Bytes::from(buffer),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotStore;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(store: &SnapshotStore) -> Router {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry).unwrap();
        router(AppState::new(store.reader(), metrics, registry))
    }

    async fn get_path(app: Router, path: &str) -> Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_content_tag_is_sha256_hex() {
        assert_eq!(
            content_tag(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_remote_addr_label() {
        let addr = SocketAddr::from(([10, 0, 0, 7], 51234));
        assert_eq!(remote_addr(Some(ConnectInfo(addr))), "10.0.0.7:51234");
        assert_eq!(remote_addr(None), "unknown");
    }

    #[tokio::test]
    async fn test_serves_with_connect_info() {
        let store = SnapshotStore::new();
        store.publish("vehicles.json", Bytes::from_static(b"{}"));

        let app = app(&store).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        let response = get_path(app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"{}");
    }

    #[test]
    fn test_if_none_match_forms() {
        assert!(if_none_match("abc", "abc"));
        assert!(if_none_match("\"abc\"", "abc"));
        assert!(if_none_match("W/\"abc\"", "abc"));
        assert!(if_none_match("\"x\", \"abc\"", "abc"));
        assert!(if_none_match("*", "abc"));
        assert!(!if_none_match("\"abd\"", "abc"));
    }

    #[tokio::test]
    async fn test_serves_document_with_headers() {
        let store = SnapshotStore::new();
        store.publish("shapes.json", Bytes::from_static(b"{\"shapes\":1}"));

        let response = get_path(app(&store), "/shapes").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ETAG].to_str().unwrap(),
            content_tag(b"{\"shapes\":1}")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"{\"shapes\":1}");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let store = SnapshotStore::new();
        store.publish("vehicles.json", Bytes::from_static(b"{}"));

        let response = get_path(app(&store), "/unknown").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_found_not_fatal() {
        let store = SnapshotStore::new();
        let app = app(&store);

        let response = get_path(app.clone(), "/alerts").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // The same router keeps serving once content arrives.
        store.publish("alerts.json", Bytes::from_static(b"[]"));
        let response = get_path(app, "/alerts").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_matching_if_none_match_is_not_modified() {
        let store = SnapshotStore::new();
        store.publish("dev_vehicles.json", Bytes::from_static(b"{}"));
        let tag = content_tag(b"{}");

        let request = Request::builder()
            .uri("/dev")
            .header(header::IF_NONE_MATCH, format!("\"{}\"", tag))
            .body(Body::empty())
            .unwrap();
        let response = app(&store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG].to_str().unwrap(), tag);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let store = SnapshotStore::new();
        let app = app(&store);
        get_path(app.clone(), "/vehicles").await;

        let response = get_path(app, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"path="/vehicles""#));
        assert!(text.contains(r#"status="404""#));
    }
}
