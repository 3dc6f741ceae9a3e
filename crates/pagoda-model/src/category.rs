// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CategoryId, Slug, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CATEGORY_NAME_MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category plus the number of published posts filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub post_count: u64,
}

/// Inbound payload for creating or updating a category. The slug is
/// always derived from the name, never client-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError(
                "category name must not be blank".to_string(),
            ));
        }
        if self.name.len() > CATEGORY_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "category name exceeds max length {CATEGORY_NAME_MAX_LEN}"
            )));
        }
        Ok(())
    }

    pub fn derive_slug(&self) -> Result<Slug, ValidationError> {
        Slug::derive(&self.name)
    }
}
