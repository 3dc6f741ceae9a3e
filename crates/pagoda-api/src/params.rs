// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use pagoda_query::{PageRequest, DEFAULT_PAGE_LIMIT};
use std::collections::HashMap;

/// Parses `page` and `limit` with defaults; malformed values fall back
/// rather than erroring, matching the public surface's tolerance.
#[must_use]
pub fn parse_pagination(params: &HashMap<String, String>) -> PageRequest {
    let page = params
        .get("page")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT);
    PageRequest::clamped(page, limit)
}

/// Strict tri-state boolean: absent ⇒ None, `true`/`false` ⇒ value,
/// anything else ⇒ None.
#[must_use]
pub fn parse_bool_param(params: &HashMap<String, String>, name: &str) -> Option<bool> {
    match params.get(name).map(String::as_str) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Parses a positive integer id out of a path or query value.
pub fn parse_id(raw: &str, label: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ApiError::validation(format!("invalid {label}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListParams {
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    pub published: Option<bool>,
    pub page: PageRequest,
}

pub fn parse_post_list_params(
    params: &HashMap<String, String>,
) -> Result<PostListParams, ApiError> {
    let category_id = params
        .get("category_id")
        .map(|raw| parse_id(raw, "category_id"))
        .transpose()?;
    Ok(PostListParams {
        slug: params.get("slug").cloned().filter(|s| !s.is_empty()),
        category_id,
        published: parse_bool_param(params, "published"),
        page: parse_pagination(params),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Trimmed; empty means "no query" and yields an empty result page.
    pub term: String,
    pub page: PageRequest,
}

#[must_use]
pub fn parse_search_params(params: &HashMap<String, String>) -> SearchParams {
    SearchParams {
        term: params
            .get("q")
            .map(|q| q.trim().to_string())
            .unwrap_or_default(),
        page: parse_pagination(params),
    }
}

/// The comment listing requires a post id.
pub fn parse_comment_list_params(params: &HashMap<String, String>) -> Result<i64, ApiError> {
    let raw = params
        .get("post_id")
        .ok_or_else(|| ApiError::validation("missing post_id parameter"))?;
    parse_id(raw, "post_id")
}
