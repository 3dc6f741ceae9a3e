use pagoda_server::{build_router, ApiConfig, AppState};
use pagoda_store::LocalMediaBackend;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn spawn_server() -> (SocketAddr, TempDir) {
    let media_dir = TempDir::new().expect("tempdir");
    let db = pagoda_store::open_in_memory().expect("open db");
    let media = Arc::new(LocalMediaBackend::new(
        media_dir.path().to_path_buf(),
        "/media".to_string(),
    ));
    let api = ApiConfig {
        admin_username: "admin".to_string(),
        admin_password: "secret".to_string(),
        session_secret: b"integration-test-secret".to_vec(),
        session_ttl: Duration::from_secs(3600),
        ..ApiConfig::default()
    };
    let state = AppState::with_config(db, media, api);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    (addr, media_dir)
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, Vec<u8>)>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    let mut payload = Vec::new();
    if let Some((content_type, bytes)) = body {
        req.push_str(&format!("Content-Type: {content_type}\r\n"));
        req.push_str(&format!("Content-Length: {}\r\n", bytes.len()));
        payload = bytes;
    }
    req.push_str("\r\n");
    let mut raw = req.into_bytes();
    raw.extend_from_slice(&payload);
    stream.write_all(&raw).await.expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

async fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let (status, _, body) = send_raw(addr, "GET", path, &[], None).await;
    let json = serde_json::from_str(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(
    addr: SocketAddr,
    path: &str,
    headers: &[(&str, &str)],
    payload: Value,
) -> (u16, Value) {
    let (status, _, body) = send_raw(
        addr,
        "POST",
        path,
        headers,
        Some(("application/json", payload.to_string().into_bytes())),
    )
    .await;
    let json = serde_json::from_str(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn login(addr: SocketAddr) -> String {
    let (status, json) = post_json(
        addr,
        "/api/admin/login",
        &[],
        serde_json::json!({"username": "admin", "password": "secret"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["success"], Value::Bool(true));
    json["token"].as_str().expect("token").to_string()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn version_and_health_endpoints_respond() {
    let (addr, _media) = spawn_server().await;
    let (status, json) = get(addr, "/api/version").await;
    assert_eq!(status, 200);
    assert_eq!(json["name"], Value::String("pagoda-server".to_string()));

    let (status, _, body) = send_raw(addr, "GET", "/healthz", &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");

    let (status, _, _) = send_raw(addr, "GET", "/readyz", &[], None).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn requests_carry_an_x_request_id() {
    let (addr, _media) = spawn_server().await;
    let (_, headers, _) = send_raw(addr, "GET", "/api/categories", &[], None).await;
    assert!(headers.contains("x-request-id: "));
}

#[tokio::test]
async fn admin_login_contract() {
    let (addr, _media) = spawn_server().await;

    let (status, json) = post_json(
        addr,
        "/api/admin/login",
        &[],
        serde_json::json!({"username": "admin", "password": "wrong"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(
        json["error"],
        Value::String("invalid username or password".to_string())
    );

    let token = login(addr).await;
    assert!(token.contains('.'));

    // garbage tokens are rejected on use
    let (status, json) = send_raw(
        addr,
        "GET",
        "/api/admin/comments",
        &[("Authorization", "Bearer not.a.token")],
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 401);
    assert!(json["error"].is_string());
}

trait PipeJson {
    fn pipe_json(self) -> (u16, Value);
}

impl PipeJson for (u16, String, String) {
    fn pipe_json(self) -> (u16, Value) {
        let json = serde_json::from_str(&self.2).unwrap_or(Value::Null);
        (self.0, json)
    }
}

#[tokio::test]
async fn mutating_routes_require_a_session() {
    let (addr, _media) = spawn_server().await;
    let (status, json) = post_json(
        addr,
        "/api/posts",
        &[],
        serde_json::json!({"title": "x", "content": "y"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(json["error"], Value::String("missing session token".to_string()));
}

#[tokio::test]
async fn post_and_category_crud_flow() {
    let (addr, _media) = spawn_server().await;
    let token = login(addr).await;
    let auth = bearer(&token);
    let auth_headers: Vec<(&str, &str)> = vec![("Authorization", auth.as_str())];

    let (status, category) = post_json(
        addr,
        "/api/categories",
        &auth_headers,
        serde_json::json!({"name": "Systems", "description": "low level"}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(category["slug"], Value::String("systems".to_string()));
    let category_id = category["id"].as_i64().expect("category id");

    // duplicate name → flat 400 envelope
    let (status, json) = post_json(
        addr,
        "/api/categories",
        &auth_headers,
        serde_json::json!({"name": "systems"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], Value::String("category already exists".to_string()));

    let (status, created) = post_json(
        addr,
        "/api/posts",
        &auth_headers,
        serde_json::json!({
            "title": "Hello Pagoda",
            "content": "The first post.",
            "category_id": category_id,
            "published": true,
        }),
    )
    .await;
    assert_eq!(status, 201);
    let slug = created["slug"].as_str().expect("slug").to_string();
    assert!(slug.starts_with("hello-pagoda-"));
    assert_eq!(created["category"]["name"], Value::String("Systems".to_string()));
    let post_id = created["id"].as_i64().expect("post id");

    // category with a post refuses deletion
    let (status, json) = send_raw(
        addr,
        "DELETE",
        &format!("/api/categories/{category_id}"),
        &auth_headers,
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 400);
    assert!(json["error"].as_str().expect("msg").contains("still has posts"));

    // slug query returns the single post in list shape
    let (status, json) = get(addr, &format!("/api/posts?slug={slug}")).await;
    assert_eq!(status, 200);
    assert_eq!(json["posts"][0]["id"].as_i64(), Some(post_id));
    assert_eq!(json["pagination"]["total"].as_i64(), Some(1));

    let (status, json) = get(addr, "/api/posts?slug=not-a-real-slug").await;
    assert_eq!(status, 404);
    assert_eq!(json["error"], Value::String("post not found".to_string()));

    // list with pagination block
    let (status, json) = get(addr, "/api/posts?published=true").await;
    assert_eq!(status, 200);
    assert_eq!(json["pagination"]["total"].as_i64(), Some(1));
    assert_eq!(json["pagination"]["page"].as_i64(), Some(1));

    // categories listing carries published-post counts
    let (status, json) = get(addr, "/api/categories").await;
    assert_eq!(status, 200);
    assert_eq!(json[0]["post_count"].as_i64(), Some(1));

    // unpublish clears published_at
    let (status, updated) = send_raw(
        addr,
        "PUT",
        &format!("/api/posts/{post_id}"),
        &auth_headers,
        Some((
            "application/json",
            serde_json::json!({
                "title": "Hello Pagoda",
                "content": "Edited.",
                "published": false,
            })
            .to_string()
            .into_bytes(),
        )),
    )
    .await
    .pipe_json();
    assert_eq!(status, 200);
    assert_eq!(updated["published"], Value::Bool(false));
    assert_eq!(updated["published_at"], Value::Null);
    // slug unchanged
    assert_eq!(updated["slug"].as_str(), Some(slug.as_str()));
}

#[tokio::test]
async fn comment_thread_flow() {
    let (addr, _media) = spawn_server().await;
    let token = login(addr).await;
    let auth = bearer(&token);
    let auth_headers: Vec<(&str, &str)> = vec![("Authorization", auth.as_str())];

    let (_, created) = post_json(
        addr,
        "/api/posts",
        &auth_headers,
        serde_json::json!({"title": "Thread", "content": "body", "published": true}),
    )
    .await;
    let post_id = created["id"].as_i64().expect("post id");

    // validation happens before any row is written
    let (status, json) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "author_name": "",
            "content": "hi",
            "fingerprint": "fp",
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(
        json["error"],
        Value::String("author name must not be blank".to_string())
    );

    let (status, json) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "author_name": "Ada",
            "content": "   ",
            "fingerprint": "fp",
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], Value::String("content must not be blank".to_string()));

    // unknown post and unknown parent are 404s
    let (status, _) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": 9999,
            "author_name": "Ada",
            "content": "hi",
            "fingerprint": "fp",
        }),
    )
    .await;
    assert_eq!(status, 404);

    let (status, json) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "parent_id": 4242,
            "author_name": "Ada",
            "content": "reply to nothing",
            "fingerprint": "fp",
        }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(
        json["error"],
        Value::String("parent comment not found".to_string())
    );

    // a small thread: root -> reply -> nested reply, plus a second root
    let (status, root) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "author_name": "Ada",
            "content": "first!",
            "fingerprint": "fp-ada",
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(root["success"], Value::Bool(true));
    let root_id = root["data"]["id"].as_i64().expect("root id");

    let (_, reply) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "parent_id": root_id,
            "author_name": "Grace",
            "content": "welcome",
            "fingerprint": "fp-grace",
            "is_author": true,
        }),
    )
    .await;
    let reply_id = reply["data"]["id"].as_i64().expect("reply id");

    let (_, nested) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "parent_id": reply_id,
            "author_name": "Ada",
            "content": "thanks",
            "fingerprint": "fp-ada",
        }),
    )
    .await;
    let nested_id = nested["data"]["id"].as_i64().expect("nested id");

    let (_, second_root) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "author_name": "Brian",
            "content": "second thread",
            "fingerprint": "fp-brian",
        }),
    )
    .await;
    let second_root_id = second_root["data"]["id"].as_i64().expect("second root id");

    // the forest: two roots, nested replies, total counts every node
    let (status, json) = get(addr, &format!("/api/comments?post_id={post_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(json["success"], Value::Bool(true));
    assert_eq!(json["total"].as_i64(), Some(4));
    let data = json["data"].as_array().expect("roots");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"].as_i64(), Some(root_id));
    assert_eq!(data[1]["id"].as_i64(), Some(second_root_id));
    assert_eq!(data[0]["replies"][0]["id"].as_i64(), Some(reply_id));
    assert_eq!(data[0]["replies"][0]["is_author"], Value::Bool(true));
    assert_eq!(
        data[0]["replies"][0]["replies"][0]["id"].as_i64(),
        Some(nested_id)
    );

    // missing post_id parameter
    let (status, json) = get(addr, "/api/comments").await;
    assert_eq!(status, 400);
    assert_eq!(
        json["error"],
        Value::String("missing post_id parameter".to_string())
    );

    // deletion is admin-only and cascades
    let (status, _) = send_raw(
        addr,
        "DELETE",
        &format!("/api/comments/{root_id}"),
        &[],
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 401);

    let (status, json) = send_raw(
        addr,
        "DELETE",
        &format!("/api/comments/{root_id}"),
        &auth_headers,
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 200);
    assert_eq!(json["success"], Value::Bool(true));

    let (_, json) = get(addr, &format!("/api/comments?post_id={post_id}")).await;
    assert_eq!(json["total"].as_i64(), Some(1));
    assert_eq!(json["data"][0]["id"].as_i64(), Some(second_root_id));

    // deleting again is a 404
    let (status, _) = send_raw(
        addr,
        "DELETE",
        &format!("/api/comments/{root_id}"),
        &auth_headers,
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn search_contract() {
    let (addr, _media) = spawn_server().await;
    let token = login(addr).await;
    let auth = bearer(&token);
    let auth_headers: Vec<(&str, &str)> = vec![("Authorization", auth.as_str())];

    for (title, content, published) in [
        ("Rust ownership", "borrow checker", true),
        ("Unrelated", "gardening", true),
        ("Hidden rust draft", "secret", false),
    ] {
        let (status, _) = post_json(
            addr,
            "/api/posts",
            &auth_headers,
            serde_json::json!({"title": title, "content": content, "published": published}),
        )
        .await;
        assert_eq!(status, 201);
    }

    // blank query is an empty page, not an error
    let (status, json) = get(addr, "/api/search").await;
    assert_eq!(status, 200);
    assert_eq!(json["posts"].as_array().expect("posts").len(), 0);
    assert_eq!(json["query"], Value::String(String::new()));
    assert_eq!(json["pagination"]["total"].as_i64(), Some(0));

    let (status, json) = get(addr, "/api/search?q=rust").await;
    assert_eq!(status, 200);
    assert_eq!(json["pagination"]["total"].as_i64(), Some(1));
    assert_eq!(json["query"], Value::String("rust".to_string()));
    let title = json["posts"][0]["title"].as_str().expect("title");
    assert_eq!(title, "<mark>Rust</mark> ownership");
}

#[tokio::test]
async fn upload_and_delete_media() {
    let (addr, media_dir) = spawn_server().await;
    let token = login(addr).await;
    let auth = bearer(&token);
    let auth_headers: Vec<(&str, &str)> = vec![("Authorization", auth.as_str())];

    let boundary = "pagoda-test-boundary";
    let file_bytes = b"fake-png-bytes".to_vec();
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"pic.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(&file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    let content_type = format!("multipart/form-data; boundary={boundary}");

    // unauthenticated upload is refused
    let (status, _, _) = send_raw(
        addr,
        "POST",
        "/api/upload",
        &[],
        Some((content_type.as_str(), body.clone())),
    )
    .await;
    assert_eq!(status, 401);

    let (status, json) = send_raw(
        addr,
        "POST",
        "/api/upload",
        &auth_headers,
        Some((content_type.as_str(), body.clone())),
    )
    .await
    .pipe_json();
    assert_eq!(status, 200);
    assert_eq!(json["success"], Value::Bool(true));
    let file_name = json["file_name"].as_str().expect("file name").to_string();
    assert!(file_name.ends_with(".png"));
    assert!(media_dir.path().join(&file_name).exists());
    assert_eq!(
        json["url"],
        Value::String(format!("/media/{file_name}"))
    );

    // unsupported content type
    let mut bad = Vec::new();
    bad.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bad.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\n",
    );
    bad.extend_from_slice(b"Content-Type: application/pdf\r\n\r\npdf\r\n");
    bad.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    let (status, json) = send_raw(
        addr,
        "POST",
        "/api/upload",
        &auth_headers,
        Some((content_type.as_str(), bad)),
    )
    .await
    .pipe_json();
    assert_eq!(status, 400);
    assert!(json["error"].as_str().expect("msg").contains("unsupported file type"));

    let (status, json) = send_raw(
        addr,
        "DELETE",
        &format!("/api/media/{file_name}"),
        &auth_headers,
        None,
    )
    .await
    .pipe_json();
    assert_eq!(status, 200);
    assert_eq!(json["success"], Value::Bool(true));
    assert!(!media_dir.path().join(&file_name).exists());
}

#[tokio::test]
async fn public_pages_render_the_comment_forest() {
    let (addr, _media) = spawn_server().await;
    let token = login(addr).await;
    let auth = bearer(&token);
    let auth_headers: Vec<(&str, &str)> = vec![("Authorization", auth.as_str())];

    let (_, created) = post_json(
        addr,
        "/api/posts",
        &auth_headers,
        serde_json::json!({"title": "Rendered", "content": "<b>unsafe</b>", "published": true}),
    )
    .await;
    let slug = created["slug"].as_str().expect("slug").to_string();
    let post_id = created["id"].as_i64().expect("id");

    let (_, root) = post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "author_name": "Ada <script>",
            "content": "root comment",
            "fingerprint": "fp",
        }),
    )
    .await;
    let root_id = root["data"]["id"].as_i64().expect("root id");
    post_json(
        addr,
        "/api/comments",
        &[],
        serde_json::json!({
            "post_id": post_id,
            "parent_id": root_id,
            "author_name": "Grace",
            "content": "a reply",
            "fingerprint": "fp2",
        }),
    )
    .await;

    let (status, _, html) = send_raw(addr, "GET", &format!("/blog/{slug}"), &[], None).await;
    assert_eq!(status, 200);
    // depth parity alternates between root and reply
    assert!(html.contains("depth-even"));
    assert!(html.contains("depth-odd"));
    assert!(html.contains("Comments (2)"));
    // untrusted text is escaped
    assert!(html.contains("Ada &lt;script&gt;"));
    assert!(html.contains("&lt;b&gt;unsafe&lt;/b&gt;"));
    assert!(!html.contains("<b>unsafe</b>"));

    let (status, _, _) = send_raw(addr, "GET", "/blog/no-such-slug", &[], None).await;
    assert_eq!(status, 404);

    let (status, _, landing) = send_raw(addr, "GET", "/", &[], None).await;
    assert_eq!(status, 200);
    assert!(landing.contains(&format!("/blog/{slug}")));
}
