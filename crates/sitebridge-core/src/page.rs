//! Storefront path classification.
//!
//! The gateway only decorates certain pages: catalog pages get the
//! upgrade-mode banner (and the capture redirect), order pages get the
//! provisioned-sites panel. Everything else passes through untouched.

use regex::Regex;
use std::sync::OnceLock;

static ORDER_RE: OnceLock<Regex> = OnceLock::new();

fn order_re() -> &'static Regex {
    ORDER_RE.get_or_init(|| {
        Regex::new(r"^/(?:checkout/order-received|my-account/view-order)/(\d+)/?$").unwrap()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Shop,
    Category,
    Tag,
    Product,
    /// Order-received / view-order page, with the order id from the path.
    Order(u64),
    Other,
}

impl PageKind {
    pub fn from_path(path: &str) -> Self {
        if let Some(caps) = order_re().captures(path) {
            if let Ok(order_id) = caps[1].parse() {
                return PageKind::Order(order_id);
            }
        }
        if in_section(path, "/shop") {
            PageKind::Shop
        } else if in_section(path, "/product-category") {
            PageKind::Category
        } else if in_section(path, "/product-tag") {
            PageKind::Tag
        } else if in_section(path, "/product") {
            PageKind::Product
        } else {
            PageKind::Other
        }
    }

    /// Catalog pages are the ones that qualify for the capture redirect and
    /// the upgrade banner.
    pub fn is_catalog(self) -> bool {
        matches!(
            self,
            PageKind::Shop | PageKind::Category | PageKind::Tag | PageKind::Product
        )
    }
}

// Segment-exact prefix: `/shop` and `/shop/sale` are in `/shop`, `/shopping`
// is not.
fn in_section(path: &str, section: &str) -> bool {
    match path.strip_prefix(section) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
