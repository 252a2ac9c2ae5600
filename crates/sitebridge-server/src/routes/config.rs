use axum::extract::State;
use axum::Json;
use sitebridge_core::config::Config;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the running gateway configuration.
///
/// Reads the shared copy, not the file: PATCHes apply immediately and this
/// endpoint reflects what the middleware is actually using.
pub async fn get_config(State(app): State<AppState>) -> Json<Config> {
    Json(app.config.read().await.clone())
}

#[derive(serde::Deserialize)]
pub struct UpdateConfigBody {
    #[serde(default)]
    use_site_id_parameter: Option<bool>,
    #[serde(default)]
    upstream: Option<String>,
    #[serde(default)]
    clear_upstream: bool,
}

/// PATCH /api/config: flip the upgrade flag and/or change the storefront
/// upstream. Persists to `.sitebridge/config.yaml` first, then swaps the
/// running copy so the change takes effect on the next request.
pub async fn update_config(
    State(app): State<AppState>,
    Json(body): Json<UpdateConfigBody>,
) -> Result<Json<Config>, AppError> {
    // The write lock is held for the whole update so concurrent PATCHes
    // serialize; the swap only lands once the file write has succeeded.
    let mut shared = app.config.write().await;
    let mut config = shared.clone();
    if let Some(enabled) = body.use_site_id_parameter {
        config.upgrade.use_site_id_parameter = enabled;
    }
    if let Some(upstream) = body.upstream {
        config.set_upstream(Some(upstream))?;
    }
    if body.clear_upstream {
        config.set_upstream(None)?;
    }

    let root = app.root.clone();
    let persisted = config.clone();
    tokio::task::spawn_blocking(move || persisted.save(&root))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    *shared = config.clone();
    Ok(Json(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn init_root() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        Config::new("test-shop").save(dir.path()).unwrap();
        dir
    }

    #[tokio::test]
    async fn patch_flips_flag_and_persists() {
        let dir = init_root();
        let app = AppState::new(dir.path().to_path_buf(), Config::load(dir.path()).unwrap());

        let body = UpdateConfigBody {
            use_site_id_parameter: Some(false),
            upstream: None,
            clear_upstream: false,
        };
        let Json(updated) = update_config(State(app.clone()), Json(body)).await.unwrap();
        assert!(!updated.upgrade.use_site_id_parameter);

        // running copy and file both updated
        assert!(!app.config.read().await.upgrade.use_site_id_parameter);
        let on_disk = Config::load(dir.path()).unwrap();
        assert!(!on_disk.upgrade.use_site_id_parameter);
    }

    #[tokio::test]
    async fn patch_sets_and_clears_upstream() {
        let dir = init_root();
        let app = AppState::new(dir.path().to_path_buf(), Config::load(dir.path()).unwrap());

        let body = UpdateConfigBody {
            use_site_id_parameter: None,
            upstream: Some("https://shop.example.com/".to_string()),
            clear_upstream: false,
        };
        let Json(updated) = update_config(State(app.clone()), Json(body)).await.unwrap();
        assert_eq!(
            updated.storefront.upstream.as_deref(),
            Some("https://shop.example.com")
        );

        let body = UpdateConfigBody {
            use_site_id_parameter: None,
            upstream: None,
            clear_upstream: true,
        };
        let Json(updated) = update_config(State(app), Json(body)).await.unwrap();
        assert!(updated.storefront.upstream.is_none());
    }

    #[tokio::test]
    async fn patch_rejects_non_http_upstream() {
        let dir = init_root();
        let app = AppState::new(dir.path().to_path_buf(), Config::load(dir.path()).unwrap());

        let body = UpdateConfigBody {
            use_site_id_parameter: None,
            upstream: Some("ftp://shop.example.com".to_string()),
            clear_upstream: false,
        };
        let err = update_config(State(app.clone()), Json(body)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        // nothing changed
        assert!(app.config.read().await.storefront.upstream.is_none());
    }

    #[tokio::test]
    async fn concurrent_patches_both_apply() {
        let dir = init_root();
        let app = AppState::new(dir.path().to_path_buf(), Config::load(dir.path()).unwrap());

        let flag = update_config(
            State(app.clone()),
            Json(UpdateConfigBody {
                use_site_id_parameter: Some(false),
                upstream: None,
                clear_upstream: false,
            }),
        );
        let upstream = update_config(
            State(app.clone()),
            Json(UpdateConfigBody {
                use_site_id_parameter: None,
                upstream: Some("https://shop.example.com".to_string()),
                clear_upstream: false,
            }),
        );
        let (flag, upstream) = tokio::join!(flag, upstream);
        flag.unwrap();
        upstream.unwrap();

        // neither update overwrote the other, in memory or on disk
        let running = app.config.read().await.clone();
        assert!(!running.upgrade.use_site_id_parameter);
        assert_eq!(
            running.storefront.upstream.as_deref(),
            Some("https://shop.example.com")
        );
        let on_disk = Config::load(dir.path()).unwrap();
        assert!(!on_disk.upgrade.use_site_id_parameter);
        assert_eq!(
            on_disk.storefront.upstream.as_deref(),
            Some("https://shop.example.com")
        );
    }
}
