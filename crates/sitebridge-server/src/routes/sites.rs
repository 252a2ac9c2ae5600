use axum::extract::{Path, State};
use axum::Json;
use sitebridge_core::site::ProvisionedSite;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/orders/{order_id}/sites: sites provisioned for an order, as the
/// order-page panel sees them. Unknown orders return an empty array.
pub async fn order_sites(
    State(app): State<AppState>,
    Path(order_id): Path<u64>,
) -> Result<Json<Vec<ProvisionedSite>>, AppError> {
    let mgr = app.sites.clone();
    let sites = tokio::task::spawn_blocking(move || mgr.get_order_sites(order_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(sites))
}
