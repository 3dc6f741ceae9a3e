// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract of the Pagoda blog API: the error envelope, inbound
//! DTOs, and query-parameter parsing. Response payloads are assembled
//! by the server handlers.

mod dto;
mod errors;
mod params;

pub use dto::LoginRequest;
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_bool_param, parse_comment_list_params, parse_id, parse_pagination,
    parse_post_list_params, parse_search_params, PostListParams, SearchParams,
};

pub const CRATE_NAME: &str = "pagoda-api";
