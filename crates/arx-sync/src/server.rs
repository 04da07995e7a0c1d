//! HTTP endpoints for hosting a repository.
//!
//! | method | path             | body                  | response            |
//! |--------|------------------|-----------------------|---------------------|
//! | GET    | `/refs`          |                       | `[RemoteRef]`       |
//! | POST   | `/objects/batch` | `{ids: [..]}`         | `[Object]`          |
//! | PUT    | `/objects/batch` | `[Object]`            | 201 `{stored}`      |
//! | POST   | `/refs`          | `[RefUpdate]`         | `[RefUpdateResult]` |
//! | GET    | `/info`          |                       | `RepoInfo`          |

use std::net::SocketAddr;
use std::sync::Arc;

use arx_store::{Object, StoreError};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::host::RepositoryHost;
use crate::types::{FetchRequest, RefUpdate, RefUpdateResult, RemoteRef, RepoInfo, StoreResponse};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// When set, every request must carry `Authorization: Bearer <token>`.
    #[serde(default)]
    pub token: Option<String>,
    /// Most object ids or objects accepted in one batch request.
    pub max_batch: usize,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7420)),
            token: None,
            max_batch: 1024,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error response: status plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = match &e {
            SyncError::Store(StoreError::HashMismatch { .. } | StoreError::CorruptObject { .. }) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    host: Arc<RepositoryHost>,
    config: Arc<ServerConfig>,
}

impl AppState {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(token) = &self.config.token else {
            return Ok(());
        };
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match presented {
            Some(p) if p == token => Ok(()),
            _ => Err(ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid token")),
        }
    }

    fn check_batch(&self, len: usize) -> Result<(), ApiError> {
        if len > self.config.max_batch {
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("batch of {len} exceeds limit of {}", self.config.max_batch),
            ));
        }
        Ok(())
    }
}

/// Build the axum router serving `host`.
pub fn build_router(host: Arc<RepositoryHost>, config: ServerConfig) -> Router {
    let body_limit = config.max_body_bytes;
    let state = AppState {
        host,
        config: Arc::new(config),
    };
    Router::new()
        .route("/refs", get(list_refs).post(update_refs))
        .route("/objects/batch", post(fetch_objects).put(store_objects))
        .route("/info", get(repo_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn list_refs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RemoteRef>>, ApiError> {
    state.authorize(&headers)?;
    Ok(Json(state.host.list_refs()?))
}

async fn fetch_objects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<FetchRequest>,
) -> Result<Json<Vec<Object>>, ApiError> {
    state.authorize(&headers)?;
    state.check_batch(request.ids.len())?;
    Ok(Json(state.host.fetch(&request.ids)?))
}

async fn store_objects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(objects): Json<Vec<Object>>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    state.authorize(&headers)?;
    state.check_batch(objects.len())?;
    let stored = state.host.store(&objects)?;
    Ok((StatusCode::CREATED, Json(StoreResponse { stored })))
}

async fn update_refs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(updates): Json<Vec<RefUpdate>>,
) -> Result<Json<Vec<RefUpdateResult>>, ApiError> {
    state.authorize(&headers)?;
    state.check_batch(updates.len())?;
    Ok(Json(state.host.update_refs(&updates)?))
}

async fn repo_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RepoInfo>, ApiError> {
    state.authorize(&headers)?;
    Ok(Json(state.host.info()))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Serves one repository over HTTP.
pub struct ArxServer {
    config: ServerConfig,
    host: Arc<RepositoryHost>,
}

impl ArxServer {
    pub fn new(config: ServerConfig, host: Arc<RepositoryHost>) -> Self {
        Self { config, host }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(self.host.clone(), self.config.clone())
    }

    /// Bind `config.bind_addr` and serve until the process stops.
    pub async fn serve(self) -> SyncResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> SyncResult<()> {
        let addr = listener.local_addr()?;
        info!(%addr, repository = %self.host.info().name, "arx server listening");
        let app = self.router();
        axum::serve(listener, app).await?;
        debug!(%addr, "arx server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_refs::{InMemoryRefStore, RefStore, RefValue};
    use arx_store::{InMemoryObjectStore, Metadata, ObjectKind, ObjectStore};
    use arx_types::{FixedClock, ObjectId};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::DateTime;
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    fn host() -> Arc<RepositoryHost> {
        let clock = Arc::new(FixedClock::default());
        let refs = InMemoryRefStore::with_clock(clock.clone());
        refs.init("main").unwrap();
        Arc::new(RepositoryHost::new(
            Arc::new(InMemoryObjectStore::with_clock(clock)),
            Arc::new(refs),
            RepoInfo {
                name: "hq".into(),
                description: "Headquarters".into(),
                version: "1".into(),
                updated: DateTime::default(),
            },
        ))
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn blob(host: &RepositoryHost, content: &[u8]) -> Object {
        let id = host.objects().create_blob(content).unwrap();
        host.objects().read(&id).unwrap()
    }

    #[tokio::test]
    async fn info_endpoint() {
        let app = build_router(host(), ServerConfig::default());
        let response = app.oneshot(request("GET", "/info", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let info: RepoInfo = json(response).await;
        assert_eq!(info.name, "hq");
        assert_eq!(info.description, "Headquarters");
    }

    #[tokio::test]
    async fn refs_endpoint_lists_head() {
        let host = host();
        let id = host.objects().create_blob(b"c").unwrap();
        host.refs()
            .update("refs/heads/main", RefValue::Direct(id), "seed")
            .unwrap();
        let app = build_router(host, ServerConfig::default());
        let response = app.oneshot(request("GET", "/refs", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let refs: Vec<RemoteRef> = json(response).await;
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].target, id.to_hex());
    }

    #[tokio::test]
    async fn put_then_fetch_objects() {
        let source = host();
        let object = blob(&source, b"floor plan");
        let target = host();
        let app = build_router(target.clone(), ServerConfig::default());

        let body = serde_json::to_value(vec![object.clone()]).unwrap();
        let response = app
            .clone()
            .oneshot(request("PUT", "/objects/batch", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let stored: StoreResponse = json(response).await;
        assert_eq!(stored.stored, 1);

        let ghost = ObjectId::from_bytes(b"ghost");
        let body = json!({ "ids": [object.id, ghost] });
        let response = app
            .oneshot(request("POST", "/objects/batch", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let objects: Vec<Object> = json(response).await;
        assert_eq!(objects, vec![object]);
    }

    #[tokio::test]
    async fn tampered_object_is_bad_request() {
        let source = host();
        let mut object = blob(&source, b"original");
        object.content = b"tampered".to_vec();
        object.size = object.content.len() as u64;
        let target = host();
        let app = build_router(target.clone(), ServerConfig::default());
        let body = serde_json::to_value(vec![object]).unwrap();
        let response = app
            .oneshot(request("PUT", "/objects/batch", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(target.objects().list().unwrap().next().is_none());
    }

    #[tokio::test]
    async fn ref_updates_are_applied() {
        let host = host();
        let commit = host
            .objects()
            .write(ObjectKind::Commit, b"{\"tree\":\"\"}", &Metadata::new())
            .unwrap();
        let app = build_router(host.clone(), ServerConfig::default());
        let body = json!([{ "name": "refs/heads/main", "old": null, "new": commit }]);
        let response = app
            .oneshot(request("POST", "/refs", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let results: Vec<RefUpdateResult> = json(response).await;
        assert!(results[0].accepted);
        assert_eq!(host.refs().resolve("refs/heads/main").unwrap(), commit);
    }

    #[tokio::test]
    async fn token_is_enforced() {
        let config = ServerConfig {
            token: Some("s3cret".into()),
            ..ServerConfig::default()
        };
        let app = build_router(host(), config);

        let response = app
            .clone()
            .oneshot(request("GET", "/info", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let authed = Request::builder()
            .uri("/info")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(authed).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_batch_is_refused() {
        let config = ServerConfig {
            max_batch: 2,
            ..ServerConfig::default()
        };
        let app = build_router(host(), config);
        let ids: Vec<ObjectId> = (0u8..3).map(|i| ObjectId::from_bytes(&[i])).collect();
        let response = app
            .oneshot(request("POST", "/objects/batch", Some(json!({ "ids": ids }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:7420".parse::<SocketAddr>().unwrap());
        assert!(c.token.is_none());
    }
}
