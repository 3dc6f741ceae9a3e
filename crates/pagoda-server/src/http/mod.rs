pub(crate) mod admin;
pub(crate) mod categories;
pub(crate) mod comments;
pub(crate) mod handlers;
pub(crate) mod pages;
pub(crate) mod posts;
pub(crate) mod search;

use crate::AppState;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pagoda_api::ApiError;
use pagoda_store::{StoreError, StoreErrorCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::Ordering;
use tracing::error;

pub(crate) fn api_error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.body())).into_response()
}

/// Maps a storage failure onto the wire taxonomy. Infrastructure
/// failures log the cause and surface a generic message.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e.code {
        StoreErrorCode::NotFound => ApiError::not_found(e.message),
        StoreErrorCode::Validation | StoreErrorCode::Conflict => ApiError::validation(e.message),
        _ => {
            error!("store failure: {e}");
            ApiError::internal()
        }
    }
}

pub(crate) fn parse_json_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::validation(format!("invalid json body: {e}")))
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) fn is_draining(state: &AppState) -> bool {
    !state.accepting_requests.load(Ordering::Relaxed)
}

pub(crate) fn draining_response() -> Response {
    let err = ApiError::new(
        pagoda_api::ApiErrorCode::Internal,
        "server draining; refusing new requests",
    );
    (StatusCode::SERVICE_UNAVAILABLE, Json(err.body())).into_response()
}

/// Admin gate: a valid, unexpired bearer session token.
pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("missing session token"))?;
    crate::auth::verify_session_token(&state.api.session_secret, token, Utc::now())
        .map_err(|_| ApiError::unauthorized("invalid or expired session token"))?;
    Ok(())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
