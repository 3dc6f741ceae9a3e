// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CommentId, PostId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FINGERPRINT_MAX_LEN: usize = 255;
pub const AUTHOR_NAME_MAX_LEN: usize = 100;
pub const AUTHOR_EMAIL_MAX_LEN: usize = 255;
pub const COMMENT_CONTENT_MAX_LEN: usize = 10_000;

/// A comment row as stored. Comments are created and deleted, never
/// updated; deletion cascades to descendants at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub fingerprint: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    pub is_author: bool,
    pub created_at: DateTime<Utc>,
}

/// Inbound comment submission, top-level or reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewComment {
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub content: String,
    pub fingerprint: String,
    #[serde(default)]
    pub is_author: bool,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        PostId::parse(self.post_id)?;
        if let Some(parent) = self.parent_id {
            CommentId::parse(parent)?;
        }
        if self.author_name.trim().is_empty() {
            return Err(ValidationError("author name must not be blank".to_string()));
        }
        if self.author_name.len() > AUTHOR_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "author name exceeds max length {AUTHOR_NAME_MAX_LEN}"
            )));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError("content must not be blank".to_string()));
        }
        if self.content.len() > COMMENT_CONTENT_MAX_LEN {
            return Err(ValidationError(format!(
                "content exceeds max length {COMMENT_CONTENT_MAX_LEN}"
            )));
        }
        if self.fingerprint.trim().is_empty() {
            return Err(ValidationError("fingerprint must not be blank".to_string()));
        }
        if self.fingerprint.len() > FINGERPRINT_MAX_LEN {
            return Err(ValidationError(format!(
                "fingerprint exceeds max length {FINGERPRINT_MAX_LEN}"
            )));
        }
        if let Some(email) = &self.author_email {
            if email.len() > AUTHOR_EMAIL_MAX_LEN {
                return Err(ValidationError(format!(
                    "author email exceeds max length {AUTHOR_EMAIL_MAX_LEN}"
                )));
            }
        }
        Ok(())
    }

    pub fn post(&self) -> Result<PostId, ValidationError> {
        PostId::parse(self.post_id)
    }

    pub fn parent(&self) -> Result<Option<CommentId>, ValidationError> {
        self.parent_id.map(CommentId::parse).transpose()
    }

    /// Whitespace-trimmed copy of the text fields; a blank email becomes
    /// absent rather than an empty string.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            post_id: self.post_id,
            parent_id: self.parent_id,
            author_name: self.author_name.trim().to_string(),
            author_email: self
                .author_email
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            content: self.content.trim().to_string(),
            fingerprint: self.fingerprint.trim().to_string(),
            is_author: self.is_author,
        }
    }
}
