use super::{
    api_error_response, draining_response, is_draining, parse_json_body, propagated_request_id,
    require_admin, store_error, with_request_id,
};
use crate::auth::issue_session_token;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pagoda_api::{ApiError, LoginRequest};
use pagoda_model::{ImageKind, StoredMedia, MAX_UPLOAD_BYTES};
use pagoda_store::media_file_name;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, warn};

/// `POST /api/admin/login` — the only unauthenticated admin route.
/// Success returns a signed expiring session token.
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match login_inner(&state, &body) {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            warn!(request_id = %request_id, "admin login rejected");
            api_error_response(&err)
        }
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/admin/login", status, started.elapsed());
    with_request_id(resp, &request_id)
}

fn login_inner(state: &AppState, body: &Bytes) -> Result<Value, ApiError> {
    let request: LoginRequest = parse_json_body(body)?;
    if request.username != state.api.admin_username
        || request.password != state.api.admin_password
    {
        return Err(ApiError::unauthorized("invalid username or password"));
    }
    let (token, expires_at) = issue_session_token(
        &state.api.session_secret,
        &request.username,
        Utc::now(),
        state.api.session_ttl,
    )
    .map_err(|_| ApiError::internal())?;
    Ok(json!({
        "success": true,
        "token": token,
        "expires_at": expires_at.to_rfc3339(),
    }))
}

/// `GET /api/admin/comments` — every comment on the site, newest
/// first, with its post attached for moderation context.
pub(crate) async fn admin_comments_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match admin_comments_inner(&state, &headers).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/admin/comments", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn admin_comments_inner(state: &AppState, headers: &HeaderMap) -> Result<Value, ApiError> {
    require_admin(state, headers)?;
    let conn = state.db.lock().await;
    let rows = pagoda_store::list_all_comments(&conn).map_err(store_error)?;
    drop(conn);
    let data: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut value = json!(row.comment);
            value["post"] = json!({
                "id": row.comment.post_id,
                "title": row.post_title,
                "slug": row.post_slug,
            });
            value
        })
        .collect();
    Ok(json!({"success": true, "total": data.len(), "data": data}))
}

/// `POST /api/upload` — one image file as multipart form data. The
/// object name is derived from the content digest, so re-uploading the
/// same bytes is idempotent.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match upload_inner(&state, &headers, multipart).await {
        Ok(media) => {
            info!(request_id = %request_id, file_name = %media.file_name, "media uploaded");
            Json(json!({
                "success": true,
                "file_name": media.file_name,
                "url": media.url,
            }))
            .into_response()
        }
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/upload", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn upload_inner(
    state: &AppState,
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> Result<StoredMedia, ApiError> {
    require_admin(state, headers)?;

    let mut file: Option<(ImageKind, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let kind = field
            .content_type()
            .and_then(ImageKind::from_content_type)
            .ok_or_else(|| {
                ApiError::validation("unsupported file type; only JPEG, PNG, GIF, WebP allowed")
            })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("file read failed: {e}")))?;
        file = Some((kind, bytes));
        break;
    }
    let (kind, bytes) = file.ok_or_else(|| ApiError::validation("no file in request"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("file is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::validation(format!(
            "file exceeds the {}MB limit",
            MAX_UPLOAD_BYTES / 1024 / 1024
        )));
    }

    let file_name = media_file_name(&bytes, kind);
    let url = state
        .media
        .put(&file_name, &bytes, kind.content_type())
        .await
        .map_err(store_error)?;
    Ok(StoredMedia {
        file_name,
        url,
        content_type: kind.content_type().to_string(),
        size_bytes: bytes.len() as u64,
    })
}

/// `DELETE /api/media/:file_name` — removes a stored object.
pub(crate) async fn delete_media_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_name): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match delete_media_inner(&state, &headers, &file_name).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/media/{file_name}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn delete_media_inner(
    state: &AppState,
    headers: &HeaderMap,
    file_name: &str,
) -> Result<(), ApiError> {
    require_admin(state, headers)?;
    state.media.delete(file_name).await.map_err(store_error)
}
