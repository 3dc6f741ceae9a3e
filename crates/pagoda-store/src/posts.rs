// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use pagoda_model::{CategoryId, CategoryRef, Post, PostId, PostInput, PostWithCategory, Slug};
use rusqlite::{Connection, OptionalExtension, Row};

const POST_COLUMNS: &str = "p.id, p.title, p.slug, p.content, p.excerpt, p.featured_image, \
     p.published, p.published_at, p.category_id, p.created_at, p.updated_at, c.name, c.slug";

struct RawPost {
    id: i64,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    featured_image: Option<String>,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

fn raw_post(row: &Row<'_>) -> rusqlite::Result<RawPost> {
    Ok(RawPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        featured_image: row.get(5)?,
        published: row.get(6)?,
        published_at: row.get(7)?,
        category_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        category_name: row.get(11)?,
        category_slug: row.get(12)?,
    })
}

fn finish_post(raw: RawPost) -> Result<PostWithCategory, StoreError> {
    let decode = |e: pagoda_model::ValidationError| {
        StoreError::new(StoreErrorCode::Decode, format!("stored post row: {e}"))
    };
    let category = match (&raw.category_id, raw.category_name, raw.category_slug) {
        (Some(id), Some(name), Some(slug)) => Some(CategoryRef {
            id: CategoryId::from_row(*id),
            name,
            slug: Slug::parse(&slug).map_err(decode)?,
        }),
        _ => None,
    };
    Ok(PostWithCategory {
        post: Post {
            id: PostId::from_row(raw.id),
            title: raw.title,
            slug: Slug::parse(&raw.slug).map_err(decode)?,
            content: raw.content,
            excerpt: raw.excerpt,
            featured_image: raw.featured_image,
            published: raw.published,
            published_at: raw.published_at,
            category_id: raw.category_id.map(CategoryId::from_row),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        },
        category,
    })
}

pub(crate) const BARE_POST_COLUMNS: &str = "id, title, slug, content, excerpt, featured_image, \
     published, published_at, category_id, created_at, updated_at";

pub(crate) struct BarePost {
    id: i64,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    featured_image: Option<String>,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub(crate) fn bare_post(row: &Row<'_>) -> rusqlite::Result<BarePost> {
    Ok(BarePost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        featured_image: row.get(5)?,
        published: row.get(6)?,
        published_at: row.get(7)?,
        category_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn finish_bare(raw: BarePost) -> Result<Post, StoreError> {
    Ok(Post {
        id: PostId::from_row(raw.id),
        title: raw.title,
        slug: Slug::parse(&raw.slug)
            .map_err(|e| StoreError::new(StoreErrorCode::Decode, format!("stored post row: {e}")))?,
        content: raw.content,
        excerpt: raw.excerpt,
        featured_image: raw.featured_image,
        published: raw.published,
        published_at: raw.published_at,
        category_id: raw.category_id.map(CategoryId::from_row),
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

/// Filters for the post listing; `None` means "no constraint".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostListFilter {
    pub category_id: Option<CategoryId>,
    pub published: Option<bool>,
}

fn require_category(conn: &Connection, id: CategoryId) -> Result<(), StoreError> {
    let exists: Option<i64> = conn
        .prepare_cached("SELECT id FROM categories WHERE id = ?1")?
        .query_row([id.get()], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::not_found("category not found"));
    }
    Ok(())
}

pub fn create_post(
    conn: &Connection,
    input: &PostInput,
    now: DateTime<Utc>,
) -> Result<PostWithCategory, StoreError> {
    input.validate()?;
    let category = input.category()?;
    if let Some(id) = category {
        require_category(conn, id)?;
    }
    let slug = input.derive_slug(now)?;
    let published_at = input.published.then_some(now);
    conn.prepare_cached(
        "INSERT INTO posts (title, slug, content, excerpt, featured_image, published, \
                            published_at, category_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )?
    .execute(rusqlite::params![
        input.title,
        slug.as_str(),
        input.content,
        input.excerpt,
        input.featured_image,
        input.published,
        published_at,
        category.map(CategoryId::get),
        now,
    ])?;
    let id = PostId::from_row(conn.last_insert_rowid());
    find_post(conn, id)?.ok_or_else(|| StoreError::not_found("post vanished after insert"))
}

pub fn find_post(conn: &Connection, id: PostId) -> Result<Option<PostWithCategory>, StoreError> {
    let raw = conn
        .prepare_cached(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = ?1"
        ))?
        .query_row([id.get()], raw_post)
        .optional()?;
    raw.map(finish_post).transpose()
}

pub fn find_post_by_slug(
    conn: &Connection,
    slug: &str,
    published_only: bool,
) -> Result<Option<PostWithCategory>, StoreError> {
    let sql = if published_only {
        format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             LEFT JOIN categories c ON c.id = p.category_id \
             WHERE p.slug = ?1 AND p.published = 1"
        )
    } else {
        format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             LEFT JOIN categories c ON c.id = p.category_id WHERE p.slug = ?1"
        )
    };
    let raw = conn
        .prepare_cached(&sql)?
        .query_row([slug], raw_post)
        .optional()?;
    raw.map(finish_post).transpose()
}

/// Lists posts newest-published first with the given filters, plus the
/// total matching count for pagination.
pub fn list_posts(
    conn: &Connection,
    filter: PostListFilter,
    limit: usize,
    offset: usize,
) -> Result<(Vec<PostWithCategory>, u64), StoreError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<rusqlite::types::Value> = Vec::new();
    if let Some(category) = filter.category_id {
        clauses.push("p.category_id = ?");
        params.push(category.get().into());
    }
    if let Some(published) = filter.published {
        clauses.push("p.published = ?");
        params.push((published as i64).into());
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn
        .prepare_cached(&format!("SELECT COUNT(*) FROM posts p {where_sql}"))?
        .query_row(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?;

    params.push((limit as i64).into());
    params.push((offset as i64).into());
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM posts p \
         LEFT JOIN categories c ON c.id = p.category_id {where_sql} \
         ORDER BY p.published_at DESC, p.created_at DESC \
         LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let raw: Vec<RawPost> = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), raw_post)?
        .collect::<Result<_, _>>()?;
    let posts = raw
        .into_iter()
        .map(finish_post)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((posts, total.max(0) as u64))
}

/// Updates a post in place. The slug is stable across updates;
/// `published_at` keeps its first value while the post stays published
/// and is cleared when the post is unpublished.
pub fn update_post(
    conn: &Connection,
    id: PostId,
    input: &PostInput,
    now: DateTime<Utc>,
) -> Result<Option<PostWithCategory>, StoreError> {
    input.validate()?;
    let category = input.category()?;
    if let Some(cid) = category {
        require_category(conn, cid)?;
    }
    let Some(existing) = find_post(conn, id)? else {
        return Ok(None);
    };
    let published_at = if input.published {
        existing.post.published_at.or(Some(now))
    } else {
        None
    };
    conn.prepare_cached(
        "UPDATE posts SET title = ?1, content = ?2, excerpt = ?3, featured_image = ?4, \
                          published = ?5, published_at = ?6, category_id = ?7, updated_at = ?8 \
         WHERE id = ?9",
    )?
    .execute(rusqlite::params![
        input.title,
        input.content,
        input.excerpt,
        input.featured_image,
        input.published,
        published_at,
        category.map(CategoryId::get),
        now,
        id.get(),
    ])?;
    find_post(conn, id)
}

/// Deletes a post; its comments go with it via the cascade.
pub fn delete_post(conn: &Connection, id: PostId) -> Result<bool, StoreError> {
    let affected = conn
        .prepare_cached("DELETE FROM posts WHERE id = ?1")?
        .execute([id.get()])?;
    Ok(affected > 0)
}

pub fn count_posts_in_category(conn: &Connection, id: CategoryId) -> Result<u64, StoreError> {
    let count: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM posts WHERE category_id = ?1")?
        .query_row([id.get()], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
