//! Integration tests for the router, the gate middleware, and the full
//! server over a real socket.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use portcullis::prelude::*;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

const GOOD_LOGIN: &str = "username=portcullis&password=portcullis";

/// A document root with an index page, a login form and two assets.
fn site() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    std::fs::write(dir.path().join("home.html"), "<h1>custom home</h1>").unwrap();
    std::fs::write(dir.path().join("login.html"), "<form method=post></form>").unwrap();
    std::fs::write(dir.path().join("style.css"), "body { color: red }").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
    dir
}

fn app_with(dir: &TempDir, sessions: SessionConfig, statics: StaticConfig) -> (Router, SharedStore) {
    let store = SessionStore::shared(sessions);
    let gate = LoginGate::new(GateConfig::default(), CredentialTable::default(), store.clone()).shared();
    let statics = StaticConfig {
        document_root: dir.path().to_path_buf(),
        ..statics
    };
    (portcullis::router(gate, &statics), store)
}

fn app(dir: &TempDir) -> (Router, SharedStore) {
    app_with(dir, SessionConfig::default(), StaticConfig::default())
}

async fn send(router: &Router, req: Request<Body>) -> Response<Body> {
    router.clone().oneshot(req).await.expect("router is infallible")
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn get_with_cookie(path: &str, cookie: &str) -> Request<Body> {
    Request::get(path).header(COOKIE, cookie).body(Body::empty()).unwrap()
}

fn login(form: &str) -> Request<Body> {
    Request::post("/login.html")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn body_string(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()[LOCATION].to_str().unwrap()
}

/// Logs in with the default credentials and returns the `mgs=<hex>` pair.
async fn login_cookie(router: &Router) -> String {
    let resp = send(router, login(GOOD_LOGIN)).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap();
    set_cookie
        .strip_suffix("; path=/")
        .expect("cookie should be scoped to /")
        .to_string()
}

// =========================================================================
// Gate behavior through the router
// =========================================================================

#[tokio::test]
async fn test_root_without_cookie_redirects_to_login() {
    let dir = site();
    let (router, _) = app(&dir);

    let resp = send(&router, get("/")).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login.html");
}

#[tokio::test]
async fn test_stylesheet_served_without_session() {
    let dir = site();
    let (router, store) = app(&dir);

    let resp = send(&router, get("/style.css")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "body { color: red }");
    assert!(store.lock().await.is_empty());
}

#[tokio::test]
async fn test_script_served_without_session() {
    let dir = site();
    let (router, _) = app(&dir);

    let resp = send(&router, get("/app.js")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_form_served_without_session() {
    let dir = site();
    let (router, _) = app(&dir);

    let resp = send(&router, get("/login.html")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("<form"));
}

#[tokio::test]
async fn test_good_login_redirects_home_with_cookie() {
    let dir = site();
    let (router, store) = app(&dir);

    let resp = send(&router, login(GOOD_LOGIN)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap();
    let hex = set_cookie
        .strip_prefix("mgs=")
        .and_then(|rest| rest.strip_suffix("; path=/"))
        .expect("cookie format");
    assert_eq!(hex.len(), 16);
    assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));

    let token: SessionToken = hex.parse().unwrap();
    assert_eq!(store.lock().await.get(&token).unwrap().username, "portcullis");
}

#[tokio::test]
async fn test_cookie_from_login_opens_index() {
    let dir = site();
    let (router, _) = app(&dir);
    let cookie = login_cookie(&router).await;

    let resp = send(&router, get_with_cookie("/", &cookie)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "<h1>home</h1>");
}

#[tokio::test]
async fn test_bad_login_redirects_to_login_without_session() {
    let dir = site();
    let (router, store) = app(&dir);

    let resp = send(&router, login("username=portcullis&password=wrong")).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login.html");
    assert!(resp.headers().get(SET_COOKIE).is_none());
    assert!(store.lock().await.is_empty());
}

#[tokio::test]
async fn test_oversized_login_body_counts_as_missing_fields() {
    let dir = site();
    let (router, store) = app(&dir);
    let padding = "x".repeat(8 * 1024);
    let form = format!("{GOOD_LOGIN}&pad={padding}");

    let resp = send(&router, login(&form)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login.html");
    assert!(store.lock().await.is_empty());
}

#[tokio::test]
async fn test_login_at_capacity_is_503_with_empty_body() {
    let dir = site();
    let sessions = SessionConfig {
        max_sessions: 1,
        ..Default::default()
    };
    let (router, store) = app_with(&dir, sessions, StaticConfig::default());
    login_cookie(&router).await;

    let resp = send(&router, login(GOOD_LOGIN)).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.headers().get(SET_COOKIE).is_none());
    assert!(body_string(resp).await.is_empty());
    assert_eq!(store.lock().await.len(), 1);
}

#[tokio::test]
async fn test_forged_cookie_redirects_to_login() {
    let dir = site();
    let (router, _) = app(&dir);
    login_cookie(&router).await;

    let resp = send(&router, get_with_cookie("/", "mgs=0123456789abcdef")).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login.html");
}

#[tokio::test(start_paused = true)]
async fn test_swept_session_cookie_redirects_to_login() {
    let dir = site();
    let (router, store) = app(&dir);
    let cookie = login_cookie(&router).await;
    let ttl = store.lock().await.config().ttl;

    tokio::time::advance(Duration::from_secs(31)).await;
    let removed = store.lock().await.sweep(tokio::time::Instant::now(), ttl);
    assert_eq!(removed.len(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    let resp = send(&router, get_with_cookie("/", &cookie)).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login.html");
}

// =========================================================================
// Static files
// =========================================================================

#[tokio::test]
async fn test_directory_path_serves_nested_index() {
    let dir = site();
    let (router, _) = app(&dir);
    let cookie = login_cookie(&router).await;

    let resp = send(&router, get_with_cookie("/docs/", &cookie)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "<h1>docs</h1>");
}

#[tokio::test]
async fn test_custom_index_file() {
    let dir = site();
    let statics = StaticConfig {
        index_file: "home.html".into(),
        ..Default::default()
    };
    let (router, _) = app_with(&dir, SessionConfig::default(), statics);
    let cookie = login_cookie(&router).await;

    let resp = send(&router, get_with_cookie("/", &cookie)).await;

    assert_eq!(body_string(resp).await, "<h1>custom home</h1>");
}

#[tokio::test]
async fn test_missing_file_with_session_is_404() {
    let dir = site();
    let (router, _) = app(&dir);
    let cookie = login_cookie(&router).await;

    let resp = send(&router, get_with_cookie("/nope.html", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Full server over TCP
// =========================================================================

/// Sends one raw HTTP/1.1 request and returns the whole response.
async fn raw_http(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("should connect");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_server_login_flow_over_tcp() {
    let dir = site();
    let server = PortcullisServer::builder()
        .bind("127.0.0.1:0")
        .document_root(dir.path())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let anonymous = raw_http(
        addr,
        "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    let lower = anonymous.to_ascii_lowercase();
    assert!(lower.starts_with("http/1.1 302"), "{anonymous}");
    assert!(lower.contains("location: /login.html"), "{anonymous}");

    let login = raw_http(
        addr,
        &format!(
            "POST /login.html HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{GOOD_LOGIN}",
            GOOD_LOGIN.len()
        ),
    )
    .await;
    let cookie = login
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("set-cookie").then(|| value.trim().to_string())
        })
        .expect("login should set a cookie");
    let pair = cookie.split(';').next().unwrap();

    let home = raw_http(
        addr,
        &format!("GET / HTTP/1.1\r\nHost: test\r\nCookie: {pair}\r\nConnection: close\r\n\r\n"),
    )
    .await;
    assert!(home.starts_with("HTTP/1.1 200"), "{home}");
    assert!(home.ends_with("<h1>home</h1>"), "{home}");

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server should stop")
        .unwrap()
        .expect("clean shutdown");
}

#[tokio::test]
async fn test_build_fails_on_missing_tls_files() {
    let dir = site();
    let result = PortcullisServer::builder()
        .bind("127.0.0.1:0")
        .tls(dir.path().join("absent.pem"), dir.path().join("absent.key"))
        .build()
        .await;

    assert!(matches!(result, Err(PortcullisError::Transport(_))));
}

#[tokio::test]
async fn test_build_rejects_invalid_broker_config() {
    let result = PortcullisServer::builder()
        .bind("127.0.0.1:0")
        .broker(BrokerConfig::with_port(0))
        .build()
        .await;

    assert!(matches!(result, Err(PortcullisError::Broker(_))));
}
