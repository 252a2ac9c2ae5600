//! Site-upgrade-intent tracking.
//!
//! When a shopper follows an upgrade link carrying `?site_id=N`, the id is
//! persisted across the purchase flow in two channels: a server-side session
//! slot and a 24-hour cookie. The session copy is authoritative; the cookie
//! covers the case where no session could be started. The whole mechanism is
//! gated by `upgrade.use_site_id_parameter` in the config.
//!
//! `IntentTracker` is deliberately free of HTTP types: the server constructs
//! one per request from the flag, the session slot, and the parsed inbound
//! cookie, and turns the returned [`CookieWrite`] into a `Set-Cookie` header.

/// Identifier of a provisioned site. Strictly positive.
pub type SiteId = u64;

/// Query parameter that starts an upgrade flow.
pub const SITE_ID_PARAM: &str = "site_id";

/// Query flag that cancels an upgrade flow. Presence-triggered; the value is
/// ignored.
pub const CLEAR_PARAM: &str = "clear_site_id";

/// Name of the client-side intent cookie.
pub const INTENT_COOKIE: &str = "sb_upgrade_site";

/// Intent cookie lifetime in seconds (24 hours).
pub const INTENT_COOKIE_MAX_AGE: u64 = 86_400;

/// Parse a raw `site_id` parameter value.
///
/// Accepts only non-empty all-ASCII-digit strings with value >= 1 that fit in
/// a `u64`. Signs, whitespace, decimals, exponents, zero, and overflow all
/// yield `None`. Malformed input is never an error anywhere in this flow.
pub fn parse_site_id(raw: &str) -> Option<SiteId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<SiteId>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}

/// Outbound cookie instruction produced by the tracker. The HTTP layer
/// renders it into a `Set-Cookie` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieWrite {
    /// Store the id with the 24-hour lifetime.
    Store(SiteId),
    /// Expire the cookie immediately (Max-Age=0).
    Expire,
}

/// Per-request view of the upgrade-intent state.
///
/// `session` is a mutable slot borrowed from the session store for the
/// request's session, or `None` when the request has no session (and none
/// could be started). `cookie` is the inbound cookie value, already parsed.
pub struct IntentTracker<'a> {
    enabled: bool,
    session: Option<&'a mut Option<SiteId>>,
    cookie: Option<SiteId>,
}

impl<'a> IntentTracker<'a> {
    pub fn new(
        enabled: bool,
        session: Option<&'a mut Option<SiteId>>,
        cookie: Option<SiteId>,
    ) -> Self {
        Self {
            enabled,
            session,
            cookie,
        }
    }

    /// Capture a raw `site_id` value into both channels.
    ///
    /// Returns `None` (and stores nothing) when the feature is disabled or
    /// the value is malformed. Otherwise the session slot, when one exists,
    /// receives the id, and the caller gets a [`CookieWrite::Store`] to emit.
    pub fn capture(&mut self, raw: &str) -> Option<CookieWrite> {
        if !self.enabled {
            return None;
        }
        let id = parse_site_id(raw)?;
        if let Some(slot) = self.session.as_deref_mut() {
            *slot = Some(id);
        }
        self.cookie = Some(id);
        Some(CookieWrite::Store(id))
    }

    /// Current intent, session copy first, cookie as fallback.
    ///
    /// Always `None` while the feature is disabled, whatever is stored.
    pub fn retrieve(&self) -> Option<SiteId> {
        if !self.enabled {
            return None;
        }
        match self.session.as_deref() {
            Some(&Some(id)) => Some(id),
            _ => self.cookie,
        }
    }

    /// Drop the intent from both channels. Idempotent.
    pub fn clear(&mut self) -> CookieWrite {
        if let Some(slot) = self.session.as_deref_mut() {
            *slot = None;
        }
        self.cookie = None;
        CookieWrite::Expire
    }
}

// ---------------------------------------------------------------------------
// Query-string helpers
// ---------------------------------------------------------------------------

/// Value of the first `name=value` pair in a raw query string.
pub fn query_param<'q>(query: &'q str, name: &str) -> Option<&'q str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Whether `name` appears in the query at all, with or without a value.
pub fn has_query_param(query: &str, name: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair == name || pair.split_once('=').is_some_and(|(k, _)| k == name))
}

/// Rebuild `path?query` with every parameter in `names` removed. Returns the
/// bare path when nothing remains.
pub fn strip_query_params(path: &str, query: &str, names: &[&str]) -> String {
    let remaining: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            if pair.is_empty() {
                return false;
            }
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !names.contains(&key)
        })
        .collect();
    if remaining.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, remaining.join("&"))
    }
}

/// Rebuild `path?query` without the single parameter `name`.
pub fn strip_query_param(path: &str, query: &str, name: &str) -> String {
    strip_query_params(path, query, &[name])
}

/// Cancel link for the upgrade banner: the current URL with the intent
/// parameters removed and `clear_site_id=1` appended.
pub fn cancel_url(path: &str, query: &str) -> String {
    let base = strip_query_params(path, query, &[SITE_ID_PARAM, CLEAR_PARAM]);
    if base.contains('?') {
        format!("{base}&{CLEAR_PARAM}=1")
    } else {
        format!("{base}?{CLEAR_PARAM}=1")
    }
}
