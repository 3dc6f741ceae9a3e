use super::{escape_html, propagated_request_id, with_request_id};
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use pagoda_query::{build_comment_forest, CommentForest};
use pagoda_store::PostListFilter;
use std::time::Instant;
use tracing::error;

fn html_response(status: StatusCode, html: String) -> Response {
    let mut resp = Response::new(Body::from(html));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    resp
}

pub(crate) async fn landing_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let conn = state.db.lock().await;
    let listing = pagoda_store::list_posts(
        &conn,
        PostListFilter {
            category_id: None,
            published: Some(true),
        },
        20,
        0,
    );
    drop(conn);

    let mut list = String::new();
    match listing {
        Ok((posts, _)) => {
            for entry in &posts {
                list.push_str(&format!(
                    "<li><a href=\"/blog/{}\">{}</a></li>",
                    entry.post.slug,
                    escape_html(&entry.post.title)
                ));
            }
        }
        Err(e) => error!("landing listing failed: {e}"),
    }
    if list.is_empty() {
        list.push_str("<li>No posts published yet.</li>");
    }
    let html = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head><body>\
<h1>{title}</h1>\
<h2>Recent Posts</h2><ul>{list}</ul>\
</body></html>",
        title = escape_html(&state.api.site_title),
    );
    let resp = html_response(StatusCode::OK, html);
    state
        .metrics
        .observe_request("/", StatusCode::OK, started.elapsed());
    with_request_id(resp, &request_id)
}

/// Walks one subtree, alternating the depth-parity class. Purely
/// cosmetic; the structure itself is unbounded.
fn render_comment(forest: &CommentForest, id: pagoda_model::CommentId, depth: usize, out: &mut String) {
    let Some(comment) = forest.get(id) else {
        return;
    };
    let parity = if depth % 2 == 0 { "depth-even" } else { "depth-odd" };
    let badge = if comment.is_author {
        " <span class=\"author-badge\">author</span>"
    } else {
        ""
    };
    out.push_str(&format!(
        "<li class=\"comment {parity}\"><p class=\"meta\"><strong>{}</strong>{badge} \
         <time>{}</time></p><p>{}</p>",
        escape_html(&comment.author_name),
        comment.created_at.to_rfc3339(),
        escape_html(&comment.content),
    ));
    let replies = forest.replies_of(id);
    if !replies.is_empty() {
        out.push_str("<ul class=\"replies\">");
        for &child in replies {
            render_comment(forest, child, depth + 1, out);
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>");
}

fn render_comment_section(forest: &CommentForest) -> String {
    if forest.is_empty() {
        return "<p>No comments yet.</p>".to_string();
    }
    let mut out = String::with_capacity(forest.len() * 128);
    out.push_str("<ul class=\"comments\">");
    for &root in forest.roots() {
        render_comment(forest, root, 0, &mut out);
    }
    out.push_str("</ul>");
    out
}

pub(crate) async fn blog_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::Path(slug): axum::extract::Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let conn = state.db.lock().await;
    let found = pagoda_store::find_post_by_slug(&conn, &slug, true);
    let entry = match found {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            drop(conn);
            let resp = html_response(
                StatusCode::NOT_FOUND,
                "<!doctype html><html><body><h1>Post not found</h1></body></html>".to_string(),
            );
            state.metrics.observe_request(
                "/blog/{slug}",
                StatusCode::NOT_FOUND,
                started.elapsed(),
            );
            return with_request_id(resp, &request_id);
        }
        Err(e) => {
            drop(conn);
            error!("post page lookup failed: {e}");
            let resp = html_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "<!doctype html><html><body><h1>Something went wrong</h1></body></html>"
                    .to_string(),
            );
            state.metrics.observe_request(
                "/blog/{slug}",
                StatusCode::INTERNAL_SERVER_ERROR,
                started.elapsed(),
            );
            return with_request_id(resp, &request_id);
        }
    };
    let comments = pagoda_store::list_comments_for_post(&conn, entry.post.id).unwrap_or_default();
    drop(conn);

    let forest = build_comment_forest(comments);
    let category_line = entry
        .category
        .as_ref()
        .map(|c| format!("<p class=\"category\">{}</p>", escape_html(&c.name)))
        .unwrap_or_default();
    let html = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title} - {site}</title></head><body>\
<article><h1>{title}</h1>{category_line}<div class=\"content\">{content}</div></article>\
<section id=\"comments\"><h2>Comments ({count})</h2>{comments}</section>\
</body></html>",
        title = escape_html(&entry.post.title),
        site = escape_html(&state.api.site_title),
        content = escape_html(&entry.post.content),
        count = forest.len(),
        comments = render_comment_section(&forest),
    );
    let resp = html_response(StatusCode::OK, html);
    state
        .metrics
        .observe_request("/blog/{slug}", StatusCode::OK, started.elapsed());
    with_request_id(resp, &request_id)
}
