use super::{
    api_error_response, draining_response, is_draining, parse_json_body, propagated_request_id,
    require_admin, store_error, with_request_id,
};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pagoda_api::{parse_id, parse_post_list_params, ApiError};
use pagoda_model::{PostId, PostInput};
use pagoda_query::PageInfo;
use pagoda_store::PostListFilter;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_posts_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let parsed = match parse_post_list_params(&params) {
        Ok(v) => v,
        Err(err) => {
            let resp = api_error_response(&err);
            state
                .metrics
                .observe_request("/api/posts", StatusCode::BAD_REQUEST, started.elapsed());
            return with_request_id(resp, &request_id);
        }
    };

    let conn = state.db.lock().await;

    // slug lookup returns the single published post in list shape so
    // the client renders both cases identically.
    if let Some(slug) = &parsed.slug {
        let result = pagoda_store::find_post_by_slug(&conn, slug, true);
        drop(conn);
        let resp = match result {
            Ok(Some(entry)) => {
                let payload = json!({
                    "posts": [entry],
                    "pagination": {"total": 1, "page": 1, "limit": 1, "total_pages": 1},
                });
                Json(payload).into_response()
            }
            Ok(None) => api_error_response(&ApiError::not_found("post not found")),
            Err(e) => api_error_response(&store_error(e)),
        };
        let status = resp.status();
        state
            .metrics
            .observe_request("/api/posts", status, started.elapsed());
        return with_request_id(resp, &request_id);
    }

    let filter = PostListFilter {
        category_id: parsed.category_id.map(pagoda_model::CategoryId::from_row),
        published: parsed.published,
    };
    let result = pagoda_store::list_posts(&conn, filter, parsed.page.limit(), parsed.page.offset());
    drop(conn);
    let resp = match result {
        Ok((posts, total)) => Json(json!({
            "posts": posts,
            "pagination": PageInfo::new(total, parsed.page),
        }))
        .into_response(),
        Err(e) => api_error_response(&store_error(e)),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/posts", status, started.elapsed());
    with_request_id(resp, &request_id)
}

pub(crate) async fn get_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match parse_id(&id, "post id") {
        Ok(id) => {
            let conn = state.db.lock().await;
            match pagoda_store::find_post(&conn, PostId::from_row(id)) {
                Ok(Some(entry)) => Json(entry).into_response(),
                Ok(None) => api_error_response(&ApiError::not_found("post not found")),
                Err(e) => api_error_response(&store_error(e)),
            }
        }
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/posts/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

pub(crate) async fn create_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match create_post_inner(&state, &headers, &body).await {
        Ok(entry) => {
            info!(request_id = %request_id, post_id = %entry.post.id, "post created");
            (StatusCode::CREATED, Json(entry)).into_response()
        }
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/posts", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn create_post_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<pagoda_model::PostWithCategory, ApiError> {
    require_admin(state, headers)?;
    let input: PostInput = parse_json_body(body)?;
    input.validate().map_err(|e| ApiError::validation(e.to_string()))?;
    let conn = state.db.lock().await;
    pagoda_store::create_post(&conn, &input, Utc::now()).map_err(store_error)
}

pub(crate) async fn update_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match update_post_inner(&state, &headers, &id, &body).await {
        Ok(entry) => Json(entry).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/posts/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn update_post_inner(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: &Bytes,
) -> Result<pagoda_model::PostWithCategory, ApiError> {
    require_admin(state, headers)?;
    let id = PostId::from_row(parse_id(raw_id, "post id")?);
    let input: PostInput = parse_json_body(body)?;
    input.validate().map_err(|e| ApiError::validation(e.to_string()))?;
    let conn = state.db.lock().await;
    pagoda_store::update_post(&conn, id, &input, Utc::now())
        .map_err(store_error)?
        .ok_or_else(|| ApiError::not_found("post not found"))
}

pub(crate) async fn delete_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match delete_post_inner(&state, &headers, &id).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/posts/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn delete_post_inner(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<(), ApiError> {
    require_admin(state, headers)?;
    let id = PostId::from_row(parse_id(raw_id, "post id")?);
    let conn = state.db.lock().await;
    let deleted = pagoda_store::delete_post(&conn, id).map_err(store_error)?;
    if !deleted {
        return Err(ApiError::not_found("post not found"));
    }
    Ok(())
}
