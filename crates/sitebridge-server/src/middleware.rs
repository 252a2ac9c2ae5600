//! Upgrade-intent middleware wrapping the whole storefront.
//!
//! Per request, in order: honor the explicit clear flag, capture a `site_id`
//! parameter, run the inner handler, then decorate HTML responses (upgrade
//! banner on catalog pages, provisioned-sites panel on order pages) and
//! attach any pending cookies. Capture on a catalog page short-circuits into
//! a redirect with the parameter stripped, so shareable URLs stay clean.
//!
//! `/api/*` is the gateway's own surface and passes through untouched.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sitebridge_core::intent::{
    cancel_url, has_query_param, parse_site_id, query_param, strip_query_param,
    strip_query_params, CookieWrite, IntentTracker, SiteId, CLEAR_PARAM, INTENT_COOKIE,
    INTENT_COOKIE_MAX_AGE, SITE_ID_PARAM,
};
use http_body::Body as _;
use sitebridge_core::page::PageKind;
use sitebridge_core::session::SESSION_COOKIE;

use crate::render;
use crate::state::AppState;

const MAX_HTML_BODY: usize = 10 * 1024 * 1024;

pub async fn storefront_middleware(
    State(app): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if path == "/api" || path.starts_with("/api/") {
        return next.run(req).await;
    }

    let enabled = app.config.read().await.upgrade.use_site_id_parameter;
    let query = req.uri().query().unwrap_or("").to_string();
    let page = PageKind::from_path(&path);
    let is_get = req.method() == Method::GET;

    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let session_id = cookie_value(&cookie_header, SESSION_COOKIE);
    let inbound_cookie = cookie_value(&cookie_header, INTENT_COOKIE)
        .and_then(|v| parse_site_id(&v));

    // Snapshot the session slot, run the tracker against the copy, write the
    // copy back afterwards. Keeps the store lock out of the decision logic.
    let slot_snapshot: Option<Option<SiteId>> = session_id
        .as_deref()
        .and_then(|sid| app.sessions.with_slot(sid, |slot| *slot));

    let mut slot_copy = slot_snapshot;
    let (intent, cookie_write, redirect) = {
        let mut tracker = IntentTracker::new(enabled, slot_copy.as_mut(), inbound_cookie);

        if enabled && has_query_param(&query, CLEAR_PARAM) {
            // Clearing wins over a simultaneous capture; the redirect strips
            // both parameters so the intent is not immediately recreated.
            let write = tracker.clear();
            let location = strip_query_params(&path, &query, &[CLEAR_PARAM, SITE_ID_PARAM]);
            tracing::debug!(%path, "upgrade intent cleared");
            (None, Some(write), Some(location))
        } else {
            let write = query_param(&query, SITE_ID_PARAM)
                .and_then(|raw| tracker.capture(raw));
            let redirect = if write.is_some() && page.is_catalog() && is_get {
                Some(strip_query_param(&path, &query, SITE_ID_PARAM))
            } else {
                None
            };
            if let Some(CookieWrite::Store(id)) = write {
                tracing::debug!(site_id = id, %path, "upgrade intent captured");
            }
            (tracker.retrieve(), write, redirect)
        }
    };

    // Write the slot copy back, or lazily begin a session for a fresh
    // capture. begin() returning None (store at capacity) is tolerated: the
    // cookie channel carries the value alone.
    let mut new_session: Option<String> = None;
    if slot_snapshot.is_some() {
        if let (Some(sid), Some(value)) = (session_id.as_deref(), slot_copy) {
            app.sessions.with_slot(sid, |slot| *slot = value);
        }
    } else if let Some(CookieWrite::Store(id)) = cookie_write {
        if let Some(sid) = app.sessions.begin() {
            app.sessions.with_slot(&sid, |slot| *slot = Some(id));
            new_session = Some(sid);
        }
    }

    if let Some(location) = redirect {
        return redirect_response(&location, cookie_write, new_session.as_deref());
    }

    let response = next.run(req).await;

    let mut response = match page {
        PageKind::Order(order_id) => decorate_order_page(&app, response, order_id).await,
        _ if page.is_catalog() => match intent {
            Some(id) => {
                let banner = render::upgrade_banner(id, &cancel_url(&path, &query));
                decorate_html(response, &banner).await
            }
            None => response,
        },
        _ => response,
    };

    attach_cookies(response.headers_mut(), cookie_write, new_session.as_deref());
    response
}

// ---------------------------------------------------------------------------
// Response decoration
// ---------------------------------------------------------------------------

/// Inject the provisioned-sites panel into an order page. Lookup failures are
/// logged and the page renders undecorated; an order page must never 500
/// because the registry hiccupped.
async fn decorate_order_page(app: &AppState, response: Response, order_id: u64) -> Response {
    let mgr = app.sites.clone();
    let sites = match tokio::task::spawn_blocking(move || mgr.get_order_sites(order_id)).await {
        Ok(Ok(sites)) => sites,
        Ok(Err(e)) => {
            tracing::warn!(order_id, error = %e, "site lookup failed");
            return response;
        }
        Err(e) => {
            tracing::warn!(order_id, error = %e, "site lookup task failed");
            return response;
        }
    };
    if sites.is_empty() {
        return response;
    }
    decorate_html(response, &render::order_sites_panel(&sites)).await
}

/// Buffer an HTML response and splice `fragment` before `</body>`. Non-HTML
/// responses and bodies over the buffer cap pass through undecorated.
async fn decorate_html(response: Response, fragment: &str) -> Response {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("text/html") {
        return response;
    }

    // Decoration is best effort. Pages reach here with an exact size (proxied
    // HTML is already buffered, the placeholder pages are in-memory strings);
    // a body over the cap, or one without an exact length, is served as-is.
    let len = response.body().size_hint().upper();
    if !len.is_some_and(|n| n <= MAX_HTML_BODY as u64) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_HTML_BODY).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer HTML response for decoration");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };
    // Length changes with the injected fragment.
    parts.headers.remove(header::CONTENT_LENGTH);
    let injected = render::inject_fragment(bytes, fragment);
    Response::from_parts(parts, Body::from(injected))
}

// ---------------------------------------------------------------------------
// Cookie plumbing
// ---------------------------------------------------------------------------

/// Value of cookie `name` in a raw `Cookie` header.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|v| v.to_string())
    })
}

/// `Set-Cookie` value for the intent cookie: 24-hour lifetime on store,
/// Max-Age=0 on expire.
pub fn intent_cookie_header(write: CookieWrite) -> String {
    match write {
        CookieWrite::Store(id) => {
            format!("{INTENT_COOKIE}={id}; Path=/; SameSite=Lax; Max-Age={INTENT_COOKIE_MAX_AGE}")
        }
        CookieWrite::Expire => format!("{INTENT_COOKIE}=; Path=/; SameSite=Lax; Max-Age=0"),
    }
}

/// `Set-Cookie` value for a fresh session. No Max-Age: it lives for the
/// browser session.
pub fn session_cookie_header(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn attach_cookies(
    headers: &mut axum::http::HeaderMap,
    cookie_write: Option<CookieWrite>,
    new_session: Option<&str>,
) {
    if let Some(write) = cookie_write {
        if let Ok(v) = HeaderValue::from_str(&intent_cookie_header(write)) {
            headers.append(header::SET_COOKIE, v);
        }
    }
    if let Some(sid) = new_session {
        if let Ok(v) = HeaderValue::from_str(&session_cookie_header(sid)) {
            headers.append(header::SET_COOKIE, v);
        }
    }
}

fn redirect_response(
    location: &str,
    cookie_write: Option<CookieWrite>,
    new_session: Option<&str>,
) -> Response {
    let mut response = Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .expect("infallible");
    attach_cookies(response.headers_mut(), cookie_write, new_session);
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
