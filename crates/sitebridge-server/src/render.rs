//! Markup production for the fragments the gateway injects into storefront
//! HTML: the upgrade-mode banner on catalog pages and the provisioned-sites
//! panel on order pages.
//!
//! Callers hand over only the data (site id + cancel URL, or the site list);
//! placement is handled by [`inject_fragment`].

use bytes::Bytes;
use sitebridge_core::intent::SiteId;
use sitebridge_core::site::ProvisionedSite;

const BANNER_STYLE: &str = "position:fixed;top:0;left:0;right:0;z-index:2147483647;\
background:#fff8e1;border-bottom:1px solid #e0c97f;padding:10px 16px;\
font-family:sans-serif;font-size:14px;color:#5f4b00";

const PANEL_STYLE: &str = "margin:24px 0;padding:16px;border:1px solid #d0d0d0;\
border-radius:8px;font-family:sans-serif";

/// Banner shown while an upgrade intent is active. `cancel_url` must point at
/// the current page with the clear flag appended.
pub fn upgrade_banner(site_id: SiteId, cancel_url: &str) -> String {
    format!(
        r#"<div id="sb-upgrade-banner" style="{BANNER_STYLE}">Upgrade mode: this purchase will be applied to site #{site_id}. <a href="{href}">Cancel upgrade</a></div>"#,
        href = escape_html(cancel_url)
    )
}

/// Panel listing every site provisioned for an order. Empty input renders to
/// an empty string so callers can skip injection.
pub fn order_sites_panel(sites: &[ProvisionedSite]) -> String {
    if sites.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<div id="sb-order-sites">"#);
    for site in sites {
        out.push_str(&format!(
            r#"<div class="sb-site" style="{PANEL_STYLE}"><h3>{heading}</h3><table>"#,
            heading = site.action.heading()
        ));
        push_link_row(&mut out, "Site", &site.url);
        push_link_row(&mut out, "Admin", &site.admin_url);
        push_row(&mut out, "Username", &site.username);
        if let Some(password) = &site.password {
            push_row(&mut out, "Password", password);
        }
        push_row(&mut out, "Status", site.status.as_str());
        out.push_str("</table></div>");
    }
    out.push_str("</div>");
    out
}

fn push_row(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "<tr><th align=\"left\">{label}</th><td>{}</td></tr>",
        escape_html(value)
    ));
}

fn push_link_row(out: &mut String, label: &str, url: &str) {
    let href = escape_html(url);
    out.push_str(&format!(
        "<tr><th align=\"left\">{label}</th><td><a href=\"{href}\">{href}</a></td></tr>"
    ));
}

/// Splice `fragment` immediately before `</body>`. If the body is not valid
/// UTF-8 it passes through untouched; if there is no `</body>` the fragment
/// is appended at the end (handles HTML fragments).
pub fn inject_fragment(body: Bytes, fragment: &str) -> Vec<u8> {
    let html = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return body.to_vec(),
    };

    if let Some(pos) = html.rfind("</body>") {
        let mut out = String::with_capacity(html.len() + fragment.len());
        out.push_str(&html[..pos]);
        out.push_str(fragment);
        out.push_str(&html[pos..]);
        out.into_bytes()
    } else {
        let mut out = html.to_string();
        out.push_str(fragment);
        out.into_bytes()
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
