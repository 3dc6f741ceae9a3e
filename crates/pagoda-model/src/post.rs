// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CategoryId, PostId, Slug, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const POST_TITLE_MAX_LEN: usize = 512;

/// A post row as stored. `published_at` is set when the post is first
/// published and cleared again when it is unpublished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: Slug,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of a category embedded in post responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithCategory {
    #[serde(flatten)]
    pub post: Post,
    pub category: Option<CategoryRef>,
}

/// Inbound payload for creating or updating a post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError("title must not be blank".to_string()));
        }
        if self.title.len() > POST_TITLE_MAX_LEN {
            return Err(ValidationError(format!(
                "title exceeds max length {POST_TITLE_MAX_LEN}"
            )));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError("content must not be blank".to_string()));
        }
        if let Some(id) = self.category_id {
            CategoryId::parse(id)?;
        }
        Ok(())
    }

    pub fn category(&self) -> Result<Option<CategoryId>, ValidationError> {
        self.category_id.map(CategoryId::parse).transpose()
    }

    /// Slug for a new post: derived from the title plus an epoch-millis
    /// suffix so identical titles never collide.
    pub fn derive_slug(&self, now: DateTime<Utc>) -> Result<Slug, ValidationError> {
        let base = Slug::derive(&self.title)?;
        Slug::parse(&format!("{}-{}", base.as_str(), now.timestamp_millis()))
    }
}
