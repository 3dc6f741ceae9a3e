#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use pagoda_store::MediaBackend;
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub mod auth;
mod http;
mod telemetry;

pub use telemetry::RequestMetrics;

pub const CRATE_NAME: &str = "pagoda-server";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub admin_username: String,
    pub admin_password: String,
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
    pub site_title: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 8 * 1024 * 1024,
            admin_username: "admin".to_string(),
            admin_password: "password".to_string(),
            session_secret: b"pagoda-dev-session-secret".to_vec(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            site_title: "Pagoda".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub media: Arc<dyn MediaBackend>,
    pub api: Arc<ApiConfig>,
    pub metrics: Arc<RequestMetrics>,
    pub request_id_seed: Arc<AtomicU64>,
    pub accepting_requests: Arc<AtomicBool>,
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(db: Connection, media: Arc<dyn MediaBackend>) -> Self {
        Self::with_config(db, media, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(db: Connection, media: Arc<dyn MediaBackend>, api: ApiConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            media,
            api: Arc::new(api),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.api.max_body_bytes;
    Router::new()
        .route("/", get(http::pages::landing_handler))
        .route("/blog/:slug", get(http::pages::blog_post_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/api/version", get(http::handlers::version_handler))
        .route(
            "/api/posts",
            get(http::posts::list_posts_handler).post(http::posts::create_post_handler),
        )
        .route(
            "/api/posts/:id",
            get(http::posts::get_post_handler)
                .put(http::posts::update_post_handler)
                .delete(http::posts::delete_post_handler),
        )
        .route(
            "/api/categories",
            get(http::categories::list_categories_handler)
                .post(http::categories::create_category_handler),
        )
        .route(
            "/api/categories/:id",
            get(http::categories::get_category_handler)
                .put(http::categories::update_category_handler)
                .delete(http::categories::delete_category_handler),
        )
        .route("/api/search", get(http::search::search_handler))
        .route(
            "/api/comments",
            get(http::comments::list_comments_handler)
                .post(http::comments::create_comment_handler),
        )
        .route(
            "/api/comments/:id",
            delete(http::comments::delete_comment_handler),
        )
        .route("/api/admin/login", post(http::admin::login_handler))
        .route("/api/admin/comments", get(http::admin::admin_comments_handler))
        .route("/api/upload", post(http::admin::upload_handler))
        .route(
            "/api/media/:file_name",
            delete(http::admin::delete_media_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
