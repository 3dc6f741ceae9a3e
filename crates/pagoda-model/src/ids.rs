// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const SLUG_MAX_LEN: usize = 255;

macro_rules! row_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn parse(raw: i64) -> Result<Self, ValidationError> {
                if raw <= 0 {
                    return Err(ValidationError(format!(
                        "{} must be a positive integer",
                        $label
                    )));
                }
                Ok(Self(raw))
            }

            /// Wraps a value already known valid (a row read back from storage).
            #[must_use]
            pub fn from_row(raw: i64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(PostId, "post id");
row_id!(CategoryId, "category id");
row_id!(CommentId, "comment id");

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Lowercases the input and collapses every run of characters outside
/// `[a-z0-9]` and the CJK unified range into a single `-`, trimming the
/// ends. Returns an empty string when nothing survives.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError("slug must not be empty".to_string()));
        }
        if input.len() > SLUG_MAX_LEN {
            return Err(ValidationError(format!(
                "slug exceeds max length {SLUG_MAX_LEN}"
            )));
        }
        if input.starts_with('-') || input.ends_with('-') {
            return Err(ValidationError(
                "slug must not start or end with '-'".to_string(),
            ));
        }
        if !input.chars().all(is_slug_char) {
            return Err(ValidationError(
                "slug must contain only lowercase alphanumerics, '-', or CJK".to_string(),
            ));
        }
        Ok(Self(input.to_string()))
    }

    /// Derives a slug from free text; fails when nothing slug-safe remains.
    pub fn derive(text: &str) -> Result<Self, ValidationError> {
        let s = slugify(text);
        if s.is_empty() {
            return Err(ValidationError(
                "no slug-safe characters in input".to_string(),
            ));
        }
        Self::parse(&s)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
