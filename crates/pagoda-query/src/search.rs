// SPDX-License-Identifier: Apache-2.0

use crate::highlight::escape_like;
use crate::page::PageRequest;
use chrono::{DateTime, Utc};
use pagoda_model::{CategoryId, CategoryRef, Post, PostId, PostWithCategory, Slug};
use rusqlite::Connection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    Sql(String),
    Decode(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sql(msg) | Self::Decode(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub posts: Vec<PostWithCategory>,
    pub total: u64,
}

struct RawHit {
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

fn decode_hit(raw: RawHit) -> Result<PostWithCategory, QueryError> {
    let slug = Slug::parse(&raw.slug).map_err(|e| QueryError::Decode(e.to_string()))?;
    let category = match (raw.category_id, raw.category_name, raw.category_slug) {
        (Some(id), Some(name), Some(slug)) => Some(CategoryRef {
            id: CategoryId::from_row(id),
            name,
            slug: Slug::parse(&slug).map_err(|e| QueryError::Decode(e.to_string()))?,
        }),
        _ => None,
    };
    Ok(PostWithCategory {
        post: Post {
            id: PostId::from_row(raw.id),
            title: raw.title,
            slug,
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

const SEARCH_WHERE: &str = "p.published = 1 AND (p.title LIKE ?1 ESCAPE '\\' \
     OR p.content LIKE ?1 ESCAPE '\\' \
     OR (p.excerpt IS NOT NULL AND p.excerpt LIKE ?1 ESCAPE '\\'))";

/// Substring search over published posts. The term is matched
/// literally (`LIKE` metacharacters escaped), case-insensitively for
/// ASCII, against title, content, and excerpt; results come back
/// newest-published first.
pub fn search_posts(
    conn: &Connection,
    term: &str,
    page: PageRequest,
) -> Result<SearchResults, QueryError> {
    let pattern = format!("%{}%", escape_like(term));

    let count_sql = format!("SELECT COUNT(*) FROM posts p WHERE {SEARCH_WHERE}");
    let total: i64 = conn
        .prepare_cached(&count_sql)
        .and_then(|mut stmt| stmt.query_row([&pattern], |row| row.get(0)))
        .map_err(|e| QueryError::Sql(e.to_string()))?;

    let rows_sql = format!(
        "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.featured_image, \
                p.published, p.published_at, p.category_id, p.created_at, p.updated_at, \
                c.name, c.slug \
         FROM posts p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE {SEARCH_WHERE} \
         ORDER BY p.published_at DESC \
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn
        .prepare_cached(&rows_sql)
        .map_err(|e| QueryError::Sql(e.to_string()))?;
    let mapped = stmt
        .query_map(
            rusqlite::params![pattern, page.limit() as i64, page.offset() as i64],
            |row| {
                Ok(RawHit {
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
            },
        )
        .map_err(|e| QueryError::Sql(e.to_string()))?;

    let raw: Vec<RawHit> = mapped
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QueryError::Sql(e.to_string()))?;
    let posts = raw
        .into_iter()
        .map(decode_hit)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchResults {
        posts,
        total: total.max(0) as u64,
    })
}
