use super::{
    api_error_response, draining_response, is_draining, parse_json_body, propagated_request_id,
    require_admin, store_error, with_request_id,
};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pagoda_api::{parse_comment_list_params, parse_id, ApiError};
use pagoda_model::{Comment, CommentId, NewComment, PostId};
use pagoda_query::build_comment_forest;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// `GET /api/comments?post_id=N` — the whole thread as a forest. The
/// tree is rebuilt from the flat listing on every call; `total` counts
/// every comment, not only roots.
pub(crate) async fn list_comments_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match list_comments_inner(&state, &params).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/comments", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn list_comments_inner(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<Value, ApiError> {
    let post_id = PostId::from_row(parse_comment_list_params(params)?);
    let conn = state.db.lock().await;
    if pagoda_store::find_post(&conn, post_id)
        .map_err(store_error)?
        .is_none()
    {
        return Err(ApiError::not_found("post not found"));
    }
    let comments = pagoda_store::list_comments_for_post(&conn, post_id).map_err(store_error)?;
    drop(conn);
    let forest = build_comment_forest(comments);
    Ok(json!({
        "success": true,
        "data": forest.to_nodes(),
        "total": forest.len(),
    }))
}

/// `POST /api/comments` — top-level comment or reply.
pub(crate) async fn create_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match create_comment_inner(&state, &body).await {
        Ok(comment) => {
            info!(request_id = %request_id, comment_id = %comment.id, post_id = %comment.post_id, "comment created");
            Json(json!({"success": true, "data": comment})).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/comments", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn create_comment_inner(state: &AppState, body: &Bytes) -> Result<Comment, ApiError> {
    let submission: NewComment = parse_json_body(body)?;
    submission
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let submission = submission.normalized();
    let conn = state.db.lock().await;
    pagoda_store::create_comment(&conn, &submission, Utc::now()).map_err(store_error)
}

/// `DELETE /api/comments/:id` — moderation; descendants cascade at the
/// storage layer.
pub(crate) async fn delete_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match delete_comment_inner(&state, &headers, &id).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/comments/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn delete_comment_inner(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<(), ApiError> {
    require_admin(state, headers)?;
    let id = CommentId::from_row(parse_id(raw_id, "comment id")?);
    let conn = state.db.lock().await;
    let deleted = pagoda_store::delete_comment(&conn, id).map_err(store_error)?;
    if !deleted {
        return Err(ApiError::not_found("comment not found"));
    }
    Ok(())
}
