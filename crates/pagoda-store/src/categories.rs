// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use pagoda_model::{Category, CategoryId, CategoryInput, CategoryWithCount, Post, Slug};
use rusqlite::{Connection, OptionalExtension, Row};

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, Option<String>, DateTime<Utc>, DateTime<Utc>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn finish_category(
    (id, name, slug, description, created_at, updated_at): (
        i64,
        String,
        String,
        Option<String>,
        DateTime<Utc>,
        DateTime<Utc>,
    ),
) -> Result<Category, StoreError> {
    Ok(Category {
        id: CategoryId::from_row(id),
        name,
        slug: Slug::parse(&slug)
            .map_err(|e| StoreError::new(StoreErrorCode::Decode, format!("stored category row: {e}")))?,
        description,
        created_at,
        updated_at,
    })
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

/// All categories in name order, each with its published-post count.
pub fn list_categories_with_counts(
    conn: &Connection,
) -> Result<Vec<CategoryWithCount>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CATEGORY_COLUMNS}, \
                (SELECT COUNT(*) FROM posts p WHERE p.category_id = categories.id AND p.published = 1) \
         FROM categories ORDER BY name ASC"
    ))?;
    let rows: Vec<(_, i64)> = stmt
        .query_map([], |row| Ok((category_from_row(row)?, row.get(6)?)))?
        .collect::<Result<_, _>>()?;
    rows.into_iter()
        .map(|(raw, count)| {
            Ok(CategoryWithCount {
                category: finish_category(raw)?,
                post_count: count.max(0) as u64,
            })
        })
        .collect()
}

pub fn find_category(conn: &Connection, id: CategoryId) -> Result<Option<Category>, StoreError> {
    let raw = conn
        .prepare_cached(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"
        ))?
        .query_row([id.get()], category_from_row)
        .optional()?;
    raw.map(finish_category).transpose()
}

pub fn find_category_by_slug(
    conn: &Connection,
    slug: &str,
) -> Result<Option<Category>, StoreError> {
    let raw = conn
        .prepare_cached(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?1"
        ))?
        .query_row([slug], category_from_row)
        .optional()?;
    raw.map(finish_category).transpose()
}

/// Published posts filed under a category, newest-published first.
pub fn category_posts(conn: &Connection, id: CategoryId) -> Result<Vec<Post>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM posts WHERE category_id = ?1 AND published = 1 \
         ORDER BY published_at DESC",
        crate::posts::BARE_POST_COLUMNS
    ))?;
    let raw: Vec<_> = stmt
        .query_map([id.get()], crate::posts::bare_post)?
        .collect::<Result<_, _>>()?;
    raw.into_iter().map(crate::posts::finish_bare).collect()
}

/// Creates a category; the slug is derived from the name and must not
/// collide with an existing one.
pub fn create_category(
    conn: &Connection,
    input: &CategoryInput,
    now: DateTime<Utc>,
) -> Result<Category, StoreError> {
    input.validate()?;
    let slug = input.derive_slug()?;
    if find_category_by_slug(conn, slug.as_str())?.is_some() {
        return Err(StoreError::conflict("category already exists"));
    }
    conn.prepare_cached(
        "INSERT INTO categories (name, slug, description, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
    )?
    .execute(rusqlite::params![
        input.name,
        slug.as_str(),
        input.description,
        now,
    ])?;
    let id = CategoryId::from_row(conn.last_insert_rowid());
    find_category(conn, id)?.ok_or_else(|| StoreError::not_found("category vanished after insert"))
}

pub fn update_category(
    conn: &Connection,
    id: CategoryId,
    input: &CategoryInput,
    now: DateTime<Utc>,
) -> Result<Option<Category>, StoreError> {
    input.validate()?;
    if find_category(conn, id)?.is_none() {
        return Ok(None);
    }
    let slug = input.derive_slug()?;
    let taken: Option<i64> = conn
        .prepare_cached("SELECT id FROM categories WHERE slug = ?1 AND id != ?2")?
        .query_row(rusqlite::params![slug.as_str(), id.get()], |row| row.get(0))
        .optional()?;
    if taken.is_some() {
        return Err(StoreError::conflict("category name already exists"));
    }
    conn.prepare_cached(
        "UPDATE categories SET name = ?1, slug = ?2, description = ?3, updated_at = ?4 \
         WHERE id = ?5",
    )?
    .execute(rusqlite::params![
        input.name,
        slug.as_str(),
        input.description,
        now,
        id.get(),
    ])?;
    find_category(conn, id)
}

/// Deletes a category; refused while any post still references it.
pub fn delete_category(conn: &Connection, id: CategoryId) -> Result<(), StoreError> {
    if find_category(conn, id)?.is_none() {
        return Err(StoreError::not_found("category not found"));
    }
    if crate::posts::count_posts_in_category(conn, id)? > 0 {
        return Err(StoreError::conflict(
            "cannot delete a category that still has posts",
        ));
    }
    conn.prepare_cached("DELETE FROM categories WHERE id = ?1")?
        .execute([id.get()])?;
    Ok(())
}
