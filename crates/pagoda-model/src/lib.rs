// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Pagoda blog domain model SSOT.
//!
//! Records are explicit typed rows; every inbound payload has a `parse`
//! or `validate` path and storage maps rows through these types only.

mod category;
mod comment;
mod ids;
mod media;
mod post;

pub use category::{Category, CategoryInput, CategoryWithCount, CATEGORY_NAME_MAX_LEN};
pub use comment::{
    Comment, NewComment, AUTHOR_EMAIL_MAX_LEN, AUTHOR_NAME_MAX_LEN, COMMENT_CONTENT_MAX_LEN,
    FINGERPRINT_MAX_LEN,
};
pub use ids::{slugify, CategoryId, CommentId, PostId, Slug, ValidationError, SLUG_MAX_LEN};
pub use media::{ImageKind, StoredMedia, MAX_UPLOAD_BYTES};
pub use post::{CategoryRef, Post, PostInput, PostWithCategory, POST_TITLE_MAX_LEN};

pub const CRATE_NAME: &str = "pagoda-model";
