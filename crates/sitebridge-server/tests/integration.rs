use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use sitebridge_core::config::Config;
use sitebridge_core::site::{FileSiteManager, ProvisionedSite, SiteAction, SiteStatus};
use std::collections::HashMap;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap an initialized project root.
fn init_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    Config::new("test-shop").save(dir.path()).unwrap();
    dir
}

fn init_root_with(mutate: impl FnOnce(&mut Config)) -> TempDir {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new("test-shop");
    mutate(&mut config);
    config.save(dir.path()).unwrap();
    dir
}

/// Build the router once per test; sessions live in the router's state, so
/// multi-request scenarios must reuse it (cloning is cheap).
fn router(dir: &TempDir) -> Router {
    sitebridge_server::build_router(dir.path().to_path_buf()).unwrap()
}

fn seed_sites(dir: &TempDir) {
    let mgr = FileSiteManager::new(dir.path());
    for (site_id, action) in [(11, SiteAction::Created), (12, SiteAction::Upgraded)] {
        mgr.append(ProvisionedSite {
            site_id,
            order_id: 100,
            url: format!("https://site-{site_id}.example.com"),
            admin_url: format!("https://site-{site_id}.example.com/wp-admin"),
            username: "admin".to_string(),
            password: None,
            status: SiteStatus::Active,
            action,
            created_at: Utc::now(),
        })
        .unwrap();
    }
}

/// Send a request via `oneshot`, with the jar rendered into a Cookie header.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    jar: &HashMap<String, String>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if !jar.is_empty() {
        let cookie = jar
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Fold a response's Set-Cookie headers into the jar, dropping expired ones
/// the way a browser would.
fn update_jar(jar: &mut HashMap<String, String>, response: &axum::response::Response) {
    for value in response.headers().get_all(header::SET_COOKIE) {
        let raw = value.to_str().unwrap();
        let pair = raw.split(';').next().unwrap_or("");
        if let Some((name, val)) = pair.split_once('=') {
            if raw.contains("Max-Age=0") || val.is_empty() {
                jar.remove(name);
            } else {
                jar.insert(name.to_string(), val.to_string());
            }
        }
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// Capture / redirect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capture_on_shop_redirects_and_strips_param() {
    let dir = init_root();
    let app = router(&dir);
    let jar = HashMap::new();

    let response = send(&app, "GET", "/shop?site_id=42", &jar, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/shop");

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("sb_upgrade_site=42;")));
    assert!(cookies.iter().any(|c| c.starts_with("sb_session=")));
}

#[tokio::test]
async fn capture_keeps_unrelated_query_params() {
    let dir = init_root();
    let app = router(&dir);

    let response = send(&app, "GET", "/shop?page=2&site_id=42", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/shop?page=2");
}

#[tokio::test]
async fn capture_on_non_catalog_page_sets_cookies_without_redirect() {
    let dir = init_root();
    let app = router(&dir);
    let mut jar = HashMap::new();

    let response = send(&app, "GET", "/?site_id=9", &jar, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    update_jar(&mut jar, &response);
    assert_eq!(jar.get("sb_upgrade_site").map(String::as_str), Some("9"));

    // the captured intent shows up on the next catalog page
    let response = send(&app, "GET", "/shop", &jar, None).await;
    let html = body_string(response).await;
    assert!(html.contains("site #9"));
}

#[tokio::test]
async fn malformed_site_id_values_never_capture() {
    let dir = init_root();
    let app = router(&dir);

    for raw in ["abc", "0", "-1", "12.5", "1e3", ""] {
        let uri = format!("/shop?site_id={raw}");
        let response = send(&app, "GET", &uri, &HashMap::new(), None).await;
        assert_eq!(response.status(), StatusCode::OK, "redirected for {raw:?}");
        assert!(
            response.headers().get(header::SET_COOKIE).is_none(),
            "cookie set for {raw:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// The full flow: capture → banner → cancel → gone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_upgrade_flow_scenario() {
    let dir = init_root();
    let app = router(&dir);
    let mut jar = HashMap::new();

    // 1. follow an upgrade link
    let response = send(&app, "GET", "/shop?site_id=42", &jar, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/shop");
    update_jar(&mut jar, &response);
    assert!(jar.contains_key("sb_session"));
    assert!(jar.contains_key("sb_upgrade_site"));

    // 2. the clean URL renders the banner with the site id and a cancel link
    let response = send(&app, "GET", "/shop", &jar, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("site #42"));
    assert!(html.contains("clear_site_id=1"));

    // 3. cancelling clears and redirects back to the clean URL
    let response = send(&app, "GET", "/shop?clear_site_id=1", &jar, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/shop");
    update_jar(&mut jar, &response);
    assert!(!jar.contains_key("sb_upgrade_site"));

    // 4. no banner afterwards, session cookie or not
    let response = send(&app, "GET", "/shop", &jar, None).await;
    let html = body_string(response).await;
    assert!(!html.contains("site #42"));
    assert!(!html.contains("sb-upgrade-banner"));
}

#[tokio::test]
async fn clearing_twice_is_harmless() {
    let dir = init_root();
    let app = router(&dir);

    for _ in 0..2 {
        let response = send(&app, "GET", "/shop?clear_site_id=1", &HashMap::new(), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}

// ---------------------------------------------------------------------------
// Feature flag
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_flag_ignores_site_id_parameter() {
    let dir = init_root_with(|c| c.upgrade.use_site_id_parameter = false);
    let app = router(&dir);

    let response = send(&app, "GET", "/shop?site_id=42", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let html = body_string(response).await;
    assert!(!html.contains("sb-upgrade-banner"));
}

#[tokio::test]
async fn disabled_flag_hides_intent_from_api() {
    let dir = init_root_with(|c| c.upgrade.use_site_id_parameter = false);
    let app = router(&dir);
    let jar = HashMap::from([("sb_upgrade_site".to_string(), "7".to_string())]);

    let response = send(&app, "GET", "/api/intent", &jar, None).await;
    let json = body_json(response).await;
    assert!(json["site_id"].is_null());
}

// ---------------------------------------------------------------------------
// Dual-channel precedence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_copy_wins_over_cookie_copy() {
    let dir = init_root();
    let app = router(&dir);
    let mut jar = HashMap::new();

    // capture 1 into the session
    let response = send(&app, "GET", "/shop?site_id=1", &jar, None).await;
    update_jar(&mut jar, &response);

    // tamper with the cookie channel
    jar.insert("sb_upgrade_site".to_string(), "2".to_string());

    let response = send(&app, "GET", "/api/intent", &jar, None).await;
    let json = body_json(response).await;
    assert_eq!(json["site_id"], 1);
}

#[tokio::test]
async fn cookie_fallback_when_no_session() {
    let dir = init_root();
    let app = router(&dir);
    let jar = HashMap::from([("sb_upgrade_site".to_string(), "7".to_string())]);

    let response = send(&app, "GET", "/api/intent", &jar, None).await;
    let json = body_json(response).await;
    assert_eq!(json["site_id"], 7);
}

#[tokio::test]
async fn api_clear_expires_cookie_and_empties_session() {
    let dir = init_root();
    let app = router(&dir);
    let mut jar = HashMap::new();

    let response = send(&app, "GET", "/shop?site_id=42", &jar, None).await;
    update_jar(&mut jar, &response);

    let response = send(&app, "POST", "/api/intent/clear", &jar, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("sb_upgrade_site=;"));
    update_jar(&mut jar, &response);
    let json = body_json(response).await;
    assert!(json["site_id"].is_null());

    // the session slot is empty too, not just the cookie
    let response = send(&app, "GET", "/api/intent", &jar, None).await;
    let json = body_json(response).await;
    assert!(json["site_id"].is_null());
}

// ---------------------------------------------------------------------------
// Order pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_page_shows_provisioned_sites() {
    let dir = init_root();
    seed_sites(&dir);
    let app = router(&dir);

    let response = send(
        &app,
        "GET",
        "/checkout/order-received/100",
        &HashMap::new(),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Your new site is ready"));
    assert!(html.contains("Your site has been upgraded"));
    assert!(html.contains("https://site-11.example.com"));
    assert!(html.contains("admin"));
}

#[tokio::test]
async fn order_page_without_sites_renders_plain() {
    let dir = init_root();
    seed_sites(&dir);
    let app = router(&dir);

    let response = send(
        &app,
        "GET",
        "/my-account/view-order/999",
        &HashMap::new(),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(!html.contains("sb-order-sites"));
}

#[tokio::test]
async fn order_sites_api_returns_json_array() {
    let dir = init_root();
    seed_sites(&dir);
    let app = router(&dir);

    let response = send(&app, "GET", "/api/orders/100/sites", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let sites = json.as_array().expect("expected JSON array");
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0]["site_id"], 11);
    assert_eq!(sites[1]["action"], "upgraded");
}

// ---------------------------------------------------------------------------
// Config API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn config_patch_flips_flag_at_runtime() {
    let dir = init_root();
    let app = router(&dir);

    let response = send(&app, "GET", "/api/config", &HashMap::new(), None).await;
    let json = body_json(response).await;
    assert_eq!(json["upgrade"]["use_site_id_parameter"], true);

    let response = send(
        &app,
        "PATCH",
        "/api/config",
        &HashMap::new(),
        Some(serde_json::json!({ "use_site_id_parameter": false })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // the middleware sees the new value immediately
    let response = send(&app, "GET", "/shop?site_id=42", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    // and it was persisted
    let on_disk = Config::load(dir.path()).unwrap();
    assert!(!on_disk.upgrade.use_site_id_parameter);
}

#[tokio::test]
async fn config_patch_rejects_bad_upstream() {
    let dir = init_root();
    let app = router(&dir);

    let response = send(
        &app,
        "PATCH",
        "/api/config",
        &HashMap::new(),
        Some(serde_json::json!({ "upstream": "ftp://shop.example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn build_router_fails_without_init() {
    let dir = TempDir::new().unwrap();
    assert!(sitebridge_server::build_router(dir.path().to_path_buf()).is_err());
}

// ---------------------------------------------------------------------------
// Placeholder storefront
// ---------------------------------------------------------------------------

#[tokio::test]
async fn home_page_serves_html() {
    let dir = init_root();
    let app = router(&dir);

    let response = send(&app, "GET", "/", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ct = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(ct.contains("text/html"));
}

#[tokio::test]
async fn unknown_path_returns_404_page() {
    let dir = init_root();
    let app = router(&dir);

    let response = send(&app, "GET", "/totally-missing", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_responses_are_never_decorated() {
    let dir = init_root();
    let app = router(&dir);
    let jar = HashMap::from([("sb_upgrade_site".to_string(), "42".to_string())]);

    let response = send(&app, "GET", "/api/config", &jar, None).await;
    let body = body_string(response).await;
    assert!(!body.contains("sb-upgrade-banner"));
}

// ---------------------------------------------------------------------------
// Proxied upstream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn proxied_upstream_html_gets_banner() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/shop")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><h1>Real shop</h1></body></html>")
        .create_async()
        .await;

    let dir = init_root_with(|c| {
        c.set_upstream(Some(server.url())).unwrap();
    });
    let app = router(&dir);
    let jar = HashMap::from([("sb_upgrade_site".to_string(), "42".to_string())]);

    let response = send(&app, "GET", "/shop", &jar, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Real shop"));
    assert!(html.contains("site #42"));

    mock.assert_async().await;
}

#[tokio::test]
async fn proxied_non_html_passes_through_untouched() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/app.js")
        .with_status(200)
        .with_header("content-type", "application/javascript")
        .with_body("console.log('shop');")
        .create_async()
        .await;

    let dir = init_root_with(|c| {
        c.set_upstream(Some(server.url())).unwrap();
    });
    let app = router(&dir);
    let jar = HashMap::from([("sb_upgrade_site".to_string(), "42".to_string())]);

    let response = send(&app, "GET", "/app.js", &jar, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body, "console.log('shop');");

    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_upstream_maps_to_502() {
    // a port nothing listens on
    let dir = init_root_with(|c| {
        c.set_upstream(Some("http://127.0.0.1:9".to_string())).unwrap();
    });
    let app = router(&dir);

    let response = send(&app, "GET", "/shop", &HashMap::new(), None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
