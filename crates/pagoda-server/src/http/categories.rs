use super::{
    api_error_response, draining_response, is_draining, parse_json_body, propagated_request_id,
    require_admin, store_error, with_request_id,
};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pagoda_api::{parse_id, ApiError};
use pagoda_model::{Category, CategoryId, CategoryInput};
use serde_json::{json, Value};
use std::time::Instant;

pub(crate) async fn list_categories_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let conn = state.db.lock().await;
    let result = pagoda_store::list_categories_with_counts(&conn);
    drop(conn);
    let resp = match result {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => api_error_response(&store_error(e)),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/categories", status, started.elapsed());
    with_request_id(resp, &request_id)
}

pub(crate) async fn get_category_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match get_category_inner(&state, &id).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/categories/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn get_category_inner(state: &AppState, raw_id: &str) -> Result<Value, ApiError> {
    let id = CategoryId::from_row(parse_id(raw_id, "category id")?);
    let conn = state.db.lock().await;
    let category = pagoda_store::find_category(&conn, id)
        .map_err(store_error)?
        .ok_or_else(|| ApiError::not_found("category not found"))?;
    let posts = pagoda_store::category_posts(&conn, id).map_err(store_error)?;
    drop(conn);
    let mut payload = serde_json::to_value(&category).map_err(|_| ApiError::internal())?;
    payload["posts"] = json!(posts);
    Ok(payload)
}

pub(crate) async fn create_category_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match create_category_inner(&state, &headers, &body).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/categories", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn create_category_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Category, ApiError> {
    require_admin(state, headers)?;
    let input: CategoryInput = parse_json_body(body)?;
    input.validate().map_err(|e| ApiError::validation(e.to_string()))?;
    let conn = state.db.lock().await;
    pagoda_store::create_category(&conn, &input, Utc::now()).map_err(store_error)
}

pub(crate) async fn update_category_handler(
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
    let resp = match update_category_inner(&state, &headers, &id, &body).await {
        Ok(category) => Json(category).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/categories/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn update_category_inner(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: &Bytes,
) -> Result<Category, ApiError> {
    require_admin(state, headers)?;
    let id = CategoryId::from_row(parse_id(raw_id, "category id")?);
    let input: CategoryInput = parse_json_body(body)?;
    input.validate().map_err(|e| ApiError::validation(e.to_string()))?;
    let conn = state.db.lock().await;
    pagoda_store::update_category(&conn, id, &input, Utc::now())
        .map_err(store_error)?
        .ok_or_else(|| ApiError::not_found("category not found"))
}

pub(crate) async fn delete_category_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        return with_request_id(draining_response(), &request_id);
    }
    let resp = match delete_category_inner(&state, &headers, &id).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/categories/{id}", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn delete_category_inner(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<(), ApiError> {
    require_admin(state, headers)?;
    let id = CategoryId::from_row(parse_id(raw_id, "category id")?);
    let conn = state.db.lock().await;
    pagoda_store::delete_category(&conn, id).map_err(store_error)
}
