// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use pagoda_model::{Comment, CommentId, NewComment, PostId, Slug};
use rusqlite::{Connection, OptionalExtension, Row};

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, fingerprint, author_name, author_email, \
     content, is_author, created_at";

struct RawComment {
    id: i64,
    post_id: i64,
    parent_id: Option<i64>,
    fingerprint: String,
    author_name: String,
    author_email: Option<String>,
    content: String,
    is_author: bool,
    created_at: DateTime<Utc>,
}

fn raw_comment(row: &Row<'_>) -> rusqlite::Result<RawComment> {
    Ok(RawComment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_id: row.get(2)?,
        fingerprint: row.get(3)?,
        author_name: row.get(4)?,
        author_email: row.get(5)?,
        content: row.get(6)?,
        is_author: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn finish_comment(raw: RawComment) -> Comment {
    Comment {
        id: CommentId::from_row(raw.id),
        post_id: PostId::from_row(raw.post_id),
        parent_id: raw.parent_id.map(CommentId::from_row),
        fingerprint: raw.fingerprint,
        author_name: raw.author_name,
        author_email: raw.author_email,
        content: raw.content,
        is_author: raw.is_author,
        created_at: raw.created_at,
    }
}

/// A comment joined with the post it belongs to, for the moderation
/// listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWithPost {
    pub comment: Comment,
    pub post_title: String,
    pub post_slug: Slug,
}

/// Persists a submission after validating its references: the post
/// must exist, and a reply's parent must exist and belong to the same
/// post. Field validation is the caller's job ([`NewComment::validate`]).
pub fn create_comment(
    conn: &Connection,
    submission: &NewComment,
    now: DateTime<Utc>,
) -> Result<Comment, StoreError> {
    let post_id = submission.post()?;
    let post_exists: Option<i64> = conn
        .prepare_cached("SELECT id FROM posts WHERE id = ?1")?
        .query_row([post_id.get()], |row| row.get(0))
        .optional()?;
    if post_exists.is_none() {
        return Err(StoreError::not_found("post not found"));
    }

    if let Some(parent_id) = submission.parent()? {
        let parent_post: Option<i64> = conn
            .prepare_cached("SELECT post_id FROM comments WHERE id = ?1")?
            .query_row([parent_id.get()], |row| row.get(0))
            .optional()?;
        match parent_post {
            None => return Err(StoreError::not_found("parent comment not found")),
            Some(owner) if owner != post_id.get() => {
                return Err(StoreError::validation(
                    "parent comment belongs to a different post",
                ));
            }
            Some(_) => {}
        }
    }

    conn.prepare_cached(
        "INSERT INTO comments (post_id, parent_id, fingerprint, author_name, author_email, \
                               content, is_author, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?
    .execute(rusqlite::params![
        post_id.get(),
        submission.parent_id,
        submission.fingerprint,
        submission.author_name,
        submission.author_email,
        submission.content,
        submission.is_author,
        now,
    ])?;
    let id = CommentId::from_row(conn.last_insert_rowid());
    find_comment(conn, id)?.ok_or_else(|| StoreError::not_found("comment vanished after insert"))
}

/// The flat input of the forest builder: one post's comments, creation
/// time ascending (id as the tiebreak).
pub fn list_comments_for_post(conn: &Connection, post_id: PostId) -> Result<Vec<Comment>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 \
         ORDER BY created_at ASC, id ASC"
    ))?;
    let raw: Vec<RawComment> = stmt
        .query_map([post_id.get()], raw_comment)?
        .collect::<Result<_, _>>()?;
    Ok(raw.into_iter().map(finish_comment).collect())
}

pub fn find_comment(conn: &Connection, id: CommentId) -> Result<Option<Comment>, StoreError> {
    let raw = conn
        .prepare_cached(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"
        ))?
        .query_row([id.get()], raw_comment)
        .optional()?;
    Ok(raw.map(finish_comment))
}

/// Deletes one comment; every transitive descendant goes with it via
/// the schema's ON DELETE CASCADE.
pub fn delete_comment(conn: &Connection, id: CommentId) -> Result<bool, StoreError> {
    let affected = conn
        .prepare_cached("DELETE FROM comments WHERE id = ?1")?
        .execute([id.get()])?;
    Ok(affected > 0)
}

/// Every comment on the site, newest first, with its post attached.
pub fn list_all_comments(conn: &Connection) -> Result<Vec<CommentWithPost>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.id, c.post_id, c.parent_id, c.fingerprint, c.author_name, c.author_email, \
                c.content, c.is_author, c.created_at, p.title, p.slug \
         FROM comments c JOIN posts p ON p.id = c.post_id \
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let raw: Vec<(RawComment, String, String)> = stmt
        .query_map([], |row| {
            Ok((raw_comment(row)?, row.get(9)?, row.get(10)?))
        })?
        .collect::<Result<_, _>>()?;
    raw.into_iter()
        .map(|(comment, post_title, post_slug)| {
            Ok(CommentWithPost {
                comment: finish_comment(comment),
                post_title,
                post_slug: Slug::parse(&post_slug).map_err(|e| {
                    StoreError::new(StoreErrorCode::Decode, format!("stored post row: {e}"))
                })?,
            })
        })
        .collect()
}
