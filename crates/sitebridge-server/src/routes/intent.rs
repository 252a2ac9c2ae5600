use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use sitebridge_core::intent::{parse_site_id, CookieWrite, IntentTracker, SiteId, INTENT_COOKIE};
use sitebridge_core::session::SESSION_COOKIE;

use crate::middleware::{cookie_value, intent_cookie_header};
use crate::state::AppState;

#[derive(serde::Serialize)]
pub struct IntentBody {
    pub site_id: Option<SiteId>,
}

/// GET /api/intent: the active upgrade intent for the calling browser, or
/// null. Follows the same precedence as page rendering: session first,
/// cookie as fallback, nothing while the feature is disabled.
pub async fn get_intent(State(app): State<AppState>, headers: HeaderMap) -> Json<IntentBody> {
    let enabled = app.config.read().await.upgrade.use_site_id_parameter;
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let session_id = cookie_value(cookie_header, SESSION_COOKIE);
    let cookie = cookie_value(cookie_header, INTENT_COOKIE).and_then(|v| parse_site_id(&v));

    let mut slot = session_id
        .as_deref()
        .and_then(|sid| app.sessions.with_slot(sid, |slot| *slot));
    let tracker = IntentTracker::new(enabled, slot.as_mut(), cookie);
    Json(IntentBody {
        site_id: tracker.retrieve(),
    })
}

/// POST /api/intent/clear: drop the intent from both channels.
///
/// Imperative and idempotent; unlike the query-flag path this is not gated
/// by the feature flag, so stale state is always removable.
pub async fn clear_intent(State(app): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Some(sid) = cookie_value(cookie_header, SESSION_COOKIE) {
        app.sessions.with_slot(&sid, |slot| *slot = None);
    }
    (
        AppendHeaders([(
            header::SET_COOKIE,
            intent_cookie_header(CookieWrite::Expire),
        )]),
        Json(IntentBody { site_id: None }),
    )
}
