pub mod error;
pub mod middleware;
pub mod proxy;
pub mod render;
pub mod routes;
pub mod state;
pub mod storefront;

use axum::routing::{get, patch, post};
use axum::Router;
use sitebridge_core::config::Config;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};

pub const DEFAULT_PORT: u16 = 4920;

/// Build the axum Router from a project root. Loads `.sitebridge/config.yaml`
/// and fails when the root was never initialized.
pub fn build_router(root: PathBuf) -> anyhow::Result<Router> {
    let config = Config::load(&root)?;
    Ok(build_router_with_state(state::AppState::new(root, config)))
}

/// Build the Router around an existing state. Used by `build_router` and
/// available for integration testing.
pub fn build_router_with_state(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Intent
        .route("/api/intent", get(routes::intent::get_intent))
        .route("/api/intent/clear", post(routes::intent::clear_intent))
        // Orders
        .route(
            "/api/orders/{order_id}/sites",
            get(routes::sites::order_sites),
        )
        // Config
        .route("/api/config", get(routes::config::get_config))
        .route("/api/config", patch(routes::config::update_config))
        // Everything else is storefront traffic.
        .fallback(storefront::storefront_handler)
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::storefront_middleware,
        ))
        .layer(cors)
        .with_state(app_state)
}

/// Start the gateway server.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let app = build_router(root)?;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("sitebridge gateway listening on http://localhost:{port}");

    if open_browser {
        let url = format!("http://localhost:{port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the gateway on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root)?;

    tracing::info!("sitebridge gateway listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
