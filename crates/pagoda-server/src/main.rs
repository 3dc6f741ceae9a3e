#![forbid(unsafe_code)]

use pagoda_server::{build_router, ApiConfig, AppState};
use pagoda_store::{LocalMediaBackend, MediaBackend, RetryPolicy, S3LikeMediaBackend};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("PAGODA_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn media_backend() -> Result<Arc<dyn MediaBackend>, String> {
    let retry = RetryPolicy {
        max_attempts: env_usize("PAGODA_MEDIA_RETRY_ATTEMPTS", 4),
        base_backoff_ms: env_u64("PAGODA_MEDIA_RETRY_BASE_MS", 120),
    };
    if env_bool("PAGODA_MEDIA_S3_ENABLED", false) {
        let base_url = env::var("PAGODA_MEDIA_S3_BASE_URL")
            .map_err(|_| "PAGODA_MEDIA_S3_BASE_URL is required when S3 enabled".to_string())?;
        return Ok(Arc::new(S3LikeMediaBackend::new(
            base_url,
            env::var("PAGODA_MEDIA_S3_PUBLIC_URL").ok(),
            env::var("PAGODA_MEDIA_S3_BEARER").ok(),
            retry,
        )));
    }
    let root = PathBuf::from(env_string("PAGODA_MEDIA_ROOT", "artifacts/media"));
    let public_base = env_string("PAGODA_MEDIA_PUBLIC_URL", "/media");
    Ok(Arc::new(LocalMediaBackend::new(root, public_base)))
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env_string("PAGODA_BIND", "0.0.0.0:8080");
    let db_path = PathBuf::from(env_string("PAGODA_DB_PATH", "artifacts/pagoda.sqlite"));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("db dir create failed: {e}"))?;
    }
    let db = pagoda_store::open_file(&db_path).map_err(|e| format!("db open failed: {e}"))?;

    let api = ApiConfig {
        max_body_bytes: env_usize("PAGODA_MAX_BODY_BYTES", 8 * 1024 * 1024),
        admin_username: env_string("PAGODA_ADMIN_USERNAME", "admin"),
        admin_password: env_string("PAGODA_ADMIN_PASSWORD", "password"),
        session_secret: env_string("PAGODA_SESSION_SECRET", "pagoda-dev-session-secret")
            .into_bytes(),
        session_ttl: Duration::from_secs(env_u64("PAGODA_SESSION_TTL_SECS", 24 * 60 * 60)),
        site_title: env_string("PAGODA_SITE_TITLE", "Pagoda"),
    };

    let state = AppState::with_config(db, media_backend()?, api);
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("pagoda-server listening on {bind_addr}");

    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            // Refuse new mutations first, then drain in-flight requests.
            accepting.store(false, Ordering::Relaxed);
            let drain_ms = env_u64("PAGODA_SHUTDOWN_DRAIN_MS", 5000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
