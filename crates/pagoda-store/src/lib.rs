// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Storage layer for the Pagoda blog: SQLite row stores with explicit
//! typed mapping at the boundary, and the media object-storage
//! backends.

mod categories;
mod comments;
mod media;
mod posts;
mod schema;

pub use categories::{
    category_posts, create_category, delete_category, find_category, find_category_by_slug,
    list_categories_with_counts, update_category,
};
pub use comments::{
    create_comment, delete_comment, find_comment, list_all_comments, list_comments_for_post,
    CommentWithPost,
};
pub use media::{
    media_file_name, sha256_hex, LocalMediaBackend, MediaBackend, RetryPolicy, S3LikeMediaBackend,
};
pub use posts::{
    count_posts_in_category, create_post, delete_post, find_post, find_post_by_slug, list_posts,
    update_post, PostListFilter,
};
pub use schema::{open_file, open_in_memory, SCHEMA_VERSION};

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Conflict,
    Sql,
    Io,
    Decode,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Sql => "sql",
            Self::Io => "io",
            Self::Decode => "decode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Validation, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Conflict, message)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::new(StoreErrorCode::Sql, e.to_string())
    }
}

impl From<pagoda_model::ValidationError> for StoreError {
    fn from(e: pagoda_model::ValidationError) -> Self {
        Self::validation(e.to_string())
    }
}
