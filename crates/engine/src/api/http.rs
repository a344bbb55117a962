//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use questline_domain::{Adventure, Character, Principal, Resource};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use super::auth::{MaybePrincipal, SessionLookup};
use crate::app::App;
use crate::use_cases::lifecycle::{Operation, Outcome, ResourceError, ResourceLifecycle, Scope};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/adventures", document_routes::<Adventure>())
        .nest("/api/characters", document_routes::<Character>())
        .nest("/api/files", super::files::routes())
}

async fn health() -> &'static str {
    "OK"
}

impl FromRef<Arc<App>> for SessionLookup {
    fn from_ref(app: &Arc<App>) -> Self {
        SessionLookup(app.sessions.clone())
    }
}

// =============================================================================
// Document routes (adventures, characters)
// =============================================================================

/// Resource kinds served by the JSON document routes.
pub trait Routed: Resource {
    fn lifecycle(app: &App) -> &ResourceLifecycle<Self>;
}

impl Routed for Adventure {
    fn lifecycle(app: &App) -> &ResourceLifecycle<Self> {
        &app.adventures
    }
}

impl Routed for Character {
    fn lifecycle(app: &App) -> &ResourceLifecycle<Self> {
        &app.characters
    }
}

fn document_routes<R>() -> Router<Arc<App>>
where
    R: Routed,
    R::Draft: DeserializeOwned,
{
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/my", get(list_mine::<R>))
        .route(
            "/{id}",
            get(read::<R>)
                .put(replace::<R>)
                .patch(patch::<R>)
                .delete(destroy::<R>),
        )
}

async fn list<R: Routed>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
) -> Result<Response, ApiError> {
    let outcome = R::lifecycle(&app).list(principal.as_ref(), Scope::All).await?;
    Ok(respond(outcome))
}

async fn list_mine<R: Routed>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
) -> Result<Response, ApiError> {
    let outcome = R::lifecycle(&app).list(principal.as_ref(), Scope::Mine).await?;
    Ok(respond(outcome))
}

async fn create<R>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Routed,
    R::Draft: DeserializeOwned,
{
    let lifecycle = R::lifecycle(&app);
    let payload = json_body(lifecycle, Operation::Create, principal.as_ref(), payload)?;
    let outcome = lifecycle.create_json(principal.as_ref(), payload).await?;
    Ok(respond(outcome))
}

async fn read<R: Routed>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = R::lifecycle(&app).read(principal.as_ref(), &token).await?;
    Ok(respond(outcome))
}

async fn replace<R>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Routed,
    R::Draft: DeserializeOwned,
{
    let lifecycle = R::lifecycle(&app);
    let payload = json_body(lifecycle, Operation::Replace, principal.as_ref(), payload)?;
    let outcome = lifecycle
        .replace_json(principal.as_ref(), &token, payload)
        .await?;
    Ok(respond(outcome))
}

async fn patch<R: Routed>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
    operations: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let lifecycle = R::lifecycle(&app);
    let operations = json_body(lifecycle, Operation::Patch, principal.as_ref(), operations)?;
    let outcome = lifecycle
        .patch(principal.as_ref(), &token, operations)
        .await?;
    Ok(respond(outcome))
}

async fn destroy<R: Routed>(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = R::lifecycle(&app).destroy(principal.as_ref(), &token).await?;
    Ok(respond(outcome))
}

/// Unwraps a JSON body, reporting a missing principal ahead of a bad body.
pub(crate) fn json_body<R: Resource>(
    lifecycle: &ResourceLifecycle<R>,
    operation: Operation,
    principal: Option<&Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Value, ApiError> {
    lifecycle.policy().authorize(operation, principal)?;
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

pub(crate) fn respond<T: Serialize>(outcome: Outcome<T>) -> Response {
    let status = StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::OK);
    match outcome.into_body() {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Resource(ResourceError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Resource(e) => match e {
                ResourceError::Unauthorized => StatusCode::UNAUTHORIZED,
                ResourceError::Forbidden { .. } => StatusCode::FORBIDDEN,
                ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ResourceError::Validation(_) => StatusCode::BAD_REQUEST,
                ResourceError::Patch(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ResourceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        ApiError::Resource(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Resource(e) => e.public_message(),
            ApiError::BadRequest(msg) => msg,
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::config::{AppConfig, SessionGrant};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use questline_domain::{Role, UserId};
    use tower::ServiceExt;

    pub(crate) const USER_TOKEN: &str = "user-token";
    pub(crate) const ADMIN_TOKEN: &str = "admin-token";

    pub(crate) struct TestServer {
        _dir: tempfile::TempDir,
        pub app: Arc<App>,
        pub router: Router,
    }

    impl TestServer {
        pub(crate) async fn start() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = AppConfig::for_tests(dir.path().join("questline.db"));
            config.session_seed = vec![
                SessionGrant {
                    token: USER_TOKEN.to_string(),
                    role: Role::User,
                    user_id: UserId::new(),
                },
                SessionGrant {
                    token: ADMIN_TOKEN.to_string(),
                    role: Role::Admin,
                    user_id: UserId::new(),
                },
            ];
            let app = Arc::new(App::build(&config).await.unwrap());
            let router = routes().with_state(app.clone());
            Self {
                _dir: dir,
                app,
                router,
            }
        }

        pub(crate) async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(value) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            self.dispatch(request.body(body).unwrap()).await
        }

        pub(crate) async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                })
            };
            (status, value)
        }
    }

    fn new_adventure() -> Value {
        json!({
            "name": "New Adventure",
            "charTemplate": {
                "stats": [{"name": "Health", "max": 10, "current": 10}],
                "attributes": [
                    {"name": "Strength", "code": "ST"},
                    {"name": "Agility", "code": "GE", "dice": "W6"},
                    {"name": "Intellect", "code": "IN", "dependencies": ["ST"]}
                ]
            }
        })
    }

    #[tokio::test]
    async fn adventure_scenario_over_http() {
        let server = TestServer::start().await;

        let (status, created) = server
            .send(Method::POST, "/api/adventures", Some(USER_TOKEN), Some(new_adventure()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "New Adventure");
        assert_eq!(created["charTemplate"]["attributes"].as_array().unwrap().len(), 3);
        let uri = format!("/api/adventures/{}", created["id"].as_str().unwrap());

        let (status, patched) = server
            .send(
                Method::PATCH,
                &uri,
                Some(USER_TOKEN),
                Some(json!([{"op": "replace", "path": "/name", "value": "Patched Adventure"}])),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["name"], "Patched Adventure");
        assert_eq!(patched["charTemplate"]["stats"].as_array().unwrap().len(), 1);
        assert_eq!(patched["charTemplate"]["attributes"].as_array().unwrap().len(), 3);

        let (status, body) = server.send(Method::DELETE, &uri, Some(USER_TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());

        let (status, body) = server.send(Method::DELETE, &uri, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = server.send(Method::DELETE, &uri, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn anonymous_requests_are_unauthorized() {
        let server = TestServer::start().await;
        let (status, body) = server.send(Method::GET, "/api/adventures", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Authentication required"}));

        let (status, _) = server
            .send(Method::GET, "/api/characters/my", Some("unknown-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn short_id_reads_match_primary_reads() {
        let server = TestServer::start().await;
        let (_, created) = server
            .send(Method::POST, "/api/adventures", Some(USER_TOKEN), Some(new_adventure()))
            .await;
        let short_id = created["shortId"].as_str().unwrap();
        assert!(short_id.len() >= 7);

        let (_, by_id) = server
            .send(
                Method::GET,
                &format!("/api/adventures/{}", created["id"].as_str().unwrap()),
                Some(USER_TOKEN),
                None,
            )
            .await;
        let (status, by_short) = server
            .send(Method::GET, &format!("/api/adventures/{short_id}"), Some(USER_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_id, by_short);
    }

    #[tokio::test]
    async fn my_listing_is_scoped_to_the_caller() {
        let server = TestServer::start().await;
        let (_, created) = server
            .send(Method::POST, "/api/adventures", Some(USER_TOKEN), Some(new_adventure()))
            .await;

        let (status, mine) = server
            .send(Method::GET, "/api/adventures/my", Some(USER_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine, json!([created]));

        let (status, admin_mine) = server
            .send(Method::GET, "/api/adventures/my", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(admin_mine, json!([]));

        let (_, all) = server
            .send(Method::GET, "/api/adventures", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_patch_is_unprocessable_and_changes_nothing() {
        let server = TestServer::start().await;
        let (_, created) = server
            .send(Method::POST, "/api/adventures", Some(USER_TOKEN), Some(new_adventure()))
            .await;
        let uri = format!("/api/adventures/{}", created["id"].as_str().unwrap());

        let (status, body) = server
            .send(
                Method::PATCH,
                &uri,
                Some(USER_TOKEN),
                Some(json!([
                    {"op": "replace", "path": "/name", "value": "Half Applied"},
                    {"op": "remove", "path": "/charTemplate/attributes/9"}
                ])),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().starts_with("Patch failed"));

        let (_, after) = server.send(Method::GET, &uri, Some(USER_TOKEN), None).await;
        assert_eq!(after, created);
    }

    #[tokio::test]
    async fn put_upserts_idempotently() {
        let server = TestServer::start().await;
        let uri = format!("/api/characters/{}", questline_domain::CharacterId::new());
        let payload = json!({"name": "Ayla", "race": "Elf", "_id": "ignored"});

        let (first_status, first) = server
            .send(Method::PUT, &uri, Some(USER_TOKEN), Some(payload.clone()))
            .await;
        let (second_status, second) = server
            .send(Method::PUT, &uri, Some(USER_TOKEN), Some(payload))
            .await;
        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(first, second);

        let (_, all) = server
            .send(Method::GET, "/api/characters", Some(USER_TOKEN), None)
            .await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (_, mine) = server
            .send(Method::GET, "/api/characters/my", Some(USER_TOKEN), None)
            .await;
        assert_eq!(mine, json!([first]));
    }

    #[tokio::test]
    async fn bad_bodies_are_rejected_after_authentication() {
        let server = TestServer::start().await;

        let request = |token: Option<&str>| {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri("/api/adventures")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            builder.body(Body::from("{not json")).unwrap()
        };

        let (status, _) = server.dispatch(request(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = server.dispatch(request(Some(USER_TOKEN))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = server
            .send(
                Method::POST,
                "/api/adventures",
                Some(USER_TOKEN),
                Some(json!({"description": "no name"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Validation failed"));
    }

    #[tokio::test]
    async fn health_is_public() {
        let server = TestServer::start().await;
        let (status, body) = server.send(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));
    }
}
