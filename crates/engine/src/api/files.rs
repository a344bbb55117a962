//! File routes: binary upload and download on top of the file lifecycle.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use questline_domain::{FileUpload, StoredFile};
use serde_json::Value;

use super::auth::MaybePrincipal;
use super::http::{json_body, respond, ApiError};
use crate::app::App;
use crate::use_cases::lifecycle::{Operation, Outcome, Scope};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

pub fn routes() -> Router<Arc<App>> {
    Router::new().route("/", get(list).post(upload)).route(
        "/{id}",
        get(download).put(replace).patch(patch).delete(destroy),
    )
}

async fn list(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
) -> Result<Response, ApiError> {
    let outcome = app.files.list(principal.as_ref(), Scope::All).await?;
    Ok(respond(outcome))
}

async fn upload(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    app.files
        .policy()
        .authorize(Operation::Create, principal.as_ref())?;
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;

        let mut file = FileUpload::new(content_type, content.to_vec(), app.clock.now());
        if let Some(name) = original_name {
            file = file.with_original_name(name);
        }
        upload = Some(file);
        break;
    }

    let upload = upload
        .ok_or_else(|| ApiError::BadRequest("Missing file in multipart form".to_string()))?;
    let outcome = app.files.create(principal.as_ref(), upload).await?;
    Ok(respond(outcome))
}

async fn download(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    match app.files.read(principal.as_ref(), &token).await? {
        Outcome::Ok(file) | Outcome::Created(file) => Ok(content_response(file)),
        Outcome::NoContent => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Replace-or-create from a raw request body.
async fn replace(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upload = FileUpload::new(content_type, body.to_vec(), app.clock.now());
    let outcome = app.files.replace(principal.as_ref(), &token, upload).await?;
    Ok(respond(outcome))
}

/// Patches file metadata. Content and identity are not patchable.
async fn patch(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
    operations: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let operations = json_body(&app.files, Operation::Patch, principal.as_ref(), operations)?;
    let outcome = app
        .files
        .patch(principal.as_ref(), &token, operations)
        .await?;
    Ok(respond(outcome))
}

async fn destroy(
    State(app): State<Arc<App>>,
    principal: MaybePrincipal,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = app.files.destroy(principal.as_ref(), &token).await?;
    Ok(respond(outcome))
}

fn content_response(file: StoredFile) -> Response {
    ([(header::CONTENT_TYPE, file.content_type)], file.content).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::tests::{TestServer, ADMIN_TOKEN, USER_TOKEN};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use questline_domain::FileName;
    use serde_json::json;
    use tower::ServiceExt;

    const BOUNDARY: &str = "questline-test-boundary";

    fn multipart_request(token: Option<&str>, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/files")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::from(body)).unwrap()
    }

    async fn raw(server: &TestServer, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {USER_TOKEN}"))
            .body(Body::empty())
            .unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, bytes.to_vec())
    }

    #[tokio::test]
    async fn upload_then_download() {
        let server = TestServer::start().await;

        let (status, file) = server
            .dispatch(multipart_request(Some(USER_TOKEN), "file", "hero.PNG", b"\x89PNG"))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let filename = file["filename"].as_str().unwrap().to_string();
        assert!(filename.ends_with(".png"));
        assert_eq!(file["url"], format!("/api/files/{filename}"));
        assert_eq!(file["contentType"], "image/png");
        assert_eq!(file["length"], 4);

        let (status, content_type, bytes) = raw(&server, &format!("/api/files/{filename}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(bytes, b"\x89PNG");

        let (_, listed) = server
            .send(Method::GET, "/api/files", Some(USER_TOKEN), None)
            .await;
        assert_eq!(listed, json!([file]));
    }

    #[tokio::test]
    async fn upload_requires_principal_and_file_field() {
        let server = TestServer::start().await;
        let (status, _) = server
            .dispatch(multipart_request(None, "file", "hero.png", b"x"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = server
            .dispatch(multipart_request(Some(USER_TOKEN), "avatar", "hero.png", b"x"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing file in multipart form");
    }

    #[tokio::test]
    async fn put_replaces_content_and_patch_edits_metadata() {
        let server = TestServer::start().await;
        let put = |bytes: &'static [u8]| {
            Request::builder()
                .method(Method::PUT)
                .uri("/api/files/map.txt")
                .header(header::AUTHORIZATION, format!("Bearer {USER_TOKEN}"))
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(bytes))
                .unwrap()
        };

        let (status, first) = server.dispatch(put(b"draft")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["length"], 5);
        let (status, second) = server.dispatch(put(b"final map")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["length"], 9);
        assert_eq!(second["uploadDate"], first["uploadDate"]);

        let (_, _, bytes) = raw(&server, "/api/files/map.txt").await;
        assert_eq!(bytes, b"final map");

        let (status, patched) = server
            .send(
                Method::PATCH,
                "/api/files/map.txt",
                Some(USER_TOKEN),
                Some(json!([
                    {"op": "replace", "path": "/contentType", "value": "text/markdown"},
                    {"op": "add", "path": "/metadata/author", "value": "gm"},
                    {"op": "replace", "path": "/length", "value": 1}
                ])),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["contentType"], "text/markdown");
        assert_eq!(patched["metadata"]["author"], "gm");
        assert_eq!(patched["length"], 9);

        let (_, content_type, bytes) = raw(&server, "/api/files/map.txt").await;
        assert_eq!(content_type.as_deref(), Some("text/markdown"));
        assert_eq!(bytes, b"final map");
    }

    #[tokio::test]
    async fn delete_requires_admin_and_is_final() {
        let server = TestServer::start().await;
        let (_, file) = server
            .dispatch(multipart_request(Some(USER_TOKEN), "file", "x.png", b"x"))
            .await;
        let uri = format!("/api/files/{}", file["filename"].as_str().unwrap());

        let (status, _) = server.send(Method::DELETE, &uri, Some(USER_TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = server.send(Method::DELETE, &uri, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = server.send(Method::DELETE, &uri, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = raw(&server, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn removing_a_character_sweeps_its_portrait() {
        let server = TestServer::start().await;
        let (_, file) = server
            .dispatch(multipart_request(Some(USER_TOKEN), "file", "face.png", b"face"))
            .await;
        let (status, character) = server
            .send(
                Method::POST,
                "/api/characters",
                Some(USER_TOKEN),
                Some(json!({"name": "Ayla", "portrait": file["url"]})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/characters/{}", character["shortId"].as_str().unwrap());
        let (status, _) = server.send(Method::DELETE, &uri, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Draining the buses guarantees the sweeper has run.
        server.app.stop_event_buses().await;
        let filename = FileName::new(file["filename"].as_str().unwrap()).unwrap();
        assert!(!server.app.file_store.exists(&filename).await.unwrap());
    }

    #[tokio::test]
    async fn shared_portrait_survives_until_its_last_user_is_removed() {
        let server = TestServer::start().await;
        let (_, file) = server
            .dispatch(multipart_request(Some(USER_TOKEN), "file", "crest.png", b"crest"))
            .await;
        let file_uri = format!("/api/files/{}", file["filename"].as_str().unwrap());

        let mut characters = Vec::new();
        for name in ["Ayla", "Brom"] {
            let (status, character) = server
                .send(
                    Method::POST,
                    "/api/characters",
                    Some(USER_TOKEN),
                    Some(json!({"name": name, "portrait": file["url"]})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            characters.push(format!("/api/characters/{}", character["id"].as_str().unwrap()));
        }

        let (status, _) = server
            .send(Method::DELETE, &characters[0], Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        server.app.stop_event_buses().await;

        let (status, _, bytes) = raw(&server, &file_uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"crest");

        let (_, survivor) = server
            .send(Method::GET, &characters[1], Some(USER_TOKEN), None)
            .await;
        assert_eq!(survivor["portrait"], file["url"]);
    }

    #[tokio::test]
    async fn patch_rejects_content_type_unsafe_for_headers() {
        let server = TestServer::start().await;
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/api/files/notes.txt")
            .header(header::AUTHORIZATION, format!("Bearer {USER_TOKEN}"))
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("notes"))
            .unwrap();
        let (status, _) = server.dispatch(request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = server
            .send(
                Method::PATCH,
                "/api/files/notes.txt",
                Some(USER_TOKEN),
                Some(json!([
                    {"op": "replace", "path": "/contentType", "value": "text/plain\nX-Evil: 1"}
                ])),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("content type"));

        let (status, content_type, bytes) = raw(&server, "/api/files/notes.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert_eq!(bytes, b"notes");
    }
}
