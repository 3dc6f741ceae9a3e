use super::{api_error_response, propagated_request_id, store_error, with_request_id};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagoda_api::{parse_search_params, ApiError};
use pagoda_query::{highlight, search_posts, PageInfo, QueryError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::error;

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = match search_inner(&state, &params).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => api_error_response(&err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/api/search", status, started.elapsed());
    with_request_id(resp, &request_id)
}

async fn search_inner(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<Value, ApiError> {
    let parsed = parse_search_params(params);

    // A blank query is an empty result page, not an error.
    if parsed.term.is_empty() {
        return Ok(json!({
            "posts": [],
            "pagination": PageInfo::new(0, parsed.page),
            "query": "",
        }));
    }

    let conn = state.db.lock().await;
    let results = search_posts(&conn, &parsed.term, parsed.page).map_err(|e| match e {
        QueryError::Sql(_) | QueryError::Decode(_) => {
            error!("search failed: {e}");
            ApiError::internal()
        }
    })?;
    drop(conn);

    let posts: Vec<Value> = results
        .posts
        .iter()
        .map(|hit| {
            let mut value = json!(hit);
            value["title"] = json!(highlight(&hit.post.title, &parsed.term));
            if let Some(excerpt) = &hit.post.excerpt {
                value["excerpt"] = json!(highlight(excerpt, &parsed.term));
            }
            value
        })
        .collect();

    Ok(json!({
        "posts": posts,
        "pagination": PageInfo::new(results.total, parsed.page),
        "query": parsed.term,
    }))
}
