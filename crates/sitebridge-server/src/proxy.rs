//! Reverse-proxy forwarding to the configured storefront upstream.
//!
//! Forwarding is deliberately dumb: headers through (minus hop-by-hop), body
//! through, status through. HTML responses are buffered so the middleware can
//! decorate them afterwards; everything else streams. Banner and panel
//! injection happen in the middleware, not here.

use axum::{
    body::Body,
    extract::Request,
    http::Uri,
    response::Response,
};
use futures::StreamExt;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Hop-by-hop headers, never forwarded in either direction.
// ---------------------------------------------------------------------------

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const MAX_REQUEST_BODY: usize = 10 * 1024 * 1024;

/// Forward `req` to the upstream origin `base` (e.g. `https://shop.example.com`).
pub async fn forward(app: &AppState, base: &str, req: Request) -> Response {
    let upstream_url = build_upstream_uri(base, req.uri());

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    // Hop-by-hop, host, and accept-encoding stay behind. Without
    // accept-encoding the upstream replies uncompressed, which injection
    // requires.
    let mut req_headers = reqwest::header::HeaderMap::new();
    for (name, value) in req.headers() {
        let lower = name.as_str().to_ascii_lowercase();
        if lower == "host" || lower == "accept-encoding" || HOP_BY_HOP.contains(&lower.as_str()) {
            continue;
        }
        if let Ok(v) = reqwest::header::HeaderValue::from_bytes(value.as_bytes()) {
            if let Ok(n) = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()) {
                req_headers.insert(n, v);
            }
        }
    }

    let body_bytes = match axum::body::to_bytes(req.into_body(), MAX_REQUEST_BODY).await {
        Ok(b) => b,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body(Body::empty())
                .expect("infallible");
        }
    };

    let upstream_resp = match app
        .http_client
        .request(method, &upstream_url)
        .headers(req_headers)
        .body(body_bytes.to_vec())
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(upstream = %upstream_url, error = %e, "upstream unreachable");
            return Response::builder()
                .status(502)
                .header("Content-Type", "text/plain")
                .body(Body::from("Could not reach storefront upstream"))
                .expect("infallible");
        }
    };

    let status = axum::http::StatusCode::from_u16(upstream_resp.status().as_u16())
        .unwrap_or(axum::http::StatusCode::BAD_GATEWAY);

    let mut builder = Response::builder().status(status);

    let content_type = upstream_resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let is_html = content_type.contains("text/html");

    for (name, value) in upstream_resp.headers() {
        let lower = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP.contains(&lower.as_str()) {
            continue;
        }
        // Injection changes the length of HTML bodies downstream.
        if is_html && (lower == "content-length" || lower == "content-encoding") {
            continue;
        }
        if let Ok(v) = axum::http::HeaderValue::from_bytes(value.as_bytes()) {
            builder = builder.header(name.as_str(), v);
        }
    }

    if is_html {
        let body_bytes = match upstream_resp.bytes().await {
            Ok(b) => b,
            Err(_) => {
                return Response::builder()
                    .status(502)
                    .body(Body::empty())
                    .expect("infallible");
            }
        };
        builder.body(Body::from(body_bytes)).expect("infallible")
    } else {
        // Stream non-HTML responses without buffering.
        let stream = upstream_resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        builder.body(Body::from_stream(stream)).expect("infallible")
    }
}

/// Build `{base}{path_and_query}` with exactly one slash at the join.
fn build_upstream_uri(base: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", base.trim_end_matches('/'), path_and_query)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
