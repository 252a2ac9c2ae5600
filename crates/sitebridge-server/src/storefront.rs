//! Fallback storefront handler.
//!
//! With `storefront.upstream` configured, every non-API request is
//! reverse-proxied there. Without one, a handful of minimal placeholder
//! pages stand in so the whole upgrade flow can be exercised standalone.
//! Decoration (banner, order panel) happens in the middleware either way.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use sitebridge_core::page::PageKind;

use crate::proxy;
use crate::state::AppState;

pub async fn storefront_handler(State(app): State<AppState>, req: Request) -> Response {
    let upstream = app.config.read().await.storefront.upstream.clone();
    match upstream {
        Some(base) => proxy::forward(&app, &base, req).await,
        None => placeholder_page(req.uri().path()),
    }
}

// ---------------------------------------------------------------------------
// Built-in placeholder pages
// ---------------------------------------------------------------------------

const HOME_BODY: &str = r#"<p>Welcome to the demo storefront.</p><nav><a href="/shop">Browse plans</a></nav>"#;

const SHOP_BODY: &str = r#"<ul class="products"><li><a href="/product/starter-plan">Starter plan</a></li><li><a href="/product/business-plan">Business plan</a></li></ul>"#;

const PRODUCT_BODY: &str =
    r#"<p>A hosted site plan.</p><p><a href="/checkout/order-received/1001">Buy now</a></p>"#;

const NOT_FOUND_BODY: &str =
    r#"<p>This page does not exist in the demo storefront.</p><p><a href="/">Back to the front page</a></p>"#;

fn placeholder_page(path: &str) -> Response {
    if path == "/" {
        return page(StatusCode::OK, "Storefront", HOME_BODY);
    }
    match PageKind::from_path(path) {
        PageKind::Shop | PageKind::Category | PageKind::Tag => {
            page(StatusCode::OK, "Shop", SHOP_BODY)
        }
        PageKind::Product => page(StatusCode::OK, "Product", PRODUCT_BODY),
        PageKind::Order(order_id) => page(
            StatusCode::OK,
            "Order received",
            &format!("<p>Thank you. Order #{order_id} is confirmed.</p>"),
        ),
        PageKind::Other => page(StatusCode::NOT_FOUND, "Not found", NOT_FOUND_BODY),
    }
}

fn page(status: StatusCode, title: &str, body: &str) -> Response {
    let html = format!(
        r#"<!doctype html><html><head><meta charset="utf-8"><title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>"#
    );
    (status, Html(html)).into_response()
}
