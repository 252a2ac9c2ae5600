//! Provisioned-site model and the site-manager collaborator.
//!
//! The gateway itself never provisions anything; it renders what a site
//! manager reports for an order. [`FileSiteManager`] reads a YAML registry
//! under `.sitebridge/` and is enough for demos and tests; a real
//! provisioning backend implements [`SiteManager`] instead.

use crate::error::{BridgeError, Result};
use crate::intent::SiteId;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// SiteStatus / SiteAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Provisioning,
    Active,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Provisioning => "provisioning",
            SiteStatus::Active => "active",
            SiteStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SiteStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "provisioning" => Ok(SiteStatus::Provisioning),
            "active" => Ok(SiteStatus::Active),
            "failed" => Ok(SiteStatus::Failed),
            other => Err(BridgeError::InvalidSiteStatus(other.to_string())),
        }
    }
}

/// Whether the order created a fresh site or upgraded an existing one. Drives
/// the wording of the order-page panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteAction {
    Created,
    Upgraded,
}

impl SiteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteAction::Created => "created",
            SiteAction::Upgraded => "upgraded",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            SiteAction::Created => "Your new site is ready",
            SiteAction::Upgraded => "Your site has been upgraded",
        }
    }
}

impl fmt::Display for SiteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SiteAction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created" => Ok(SiteAction::Created),
            "upgraded" => Ok(SiteAction::Upgraded),
            other => Err(BridgeError::InvalidSiteAction(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisionedSite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedSite {
    pub site_id: SiteId,
    pub order_id: u64,
    pub url: String,
    pub admin_url: String,
    pub username: String,
    /// Only present until the first login; panels omit the row when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_status")]
    pub status: SiteStatus,
    #[serde(default = "default_action")]
    pub action: SiteAction,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_status() -> SiteStatus {
    SiteStatus::Active
}

fn default_action() -> SiteAction {
    SiteAction::Created
}

// ---------------------------------------------------------------------------
// SiteManager
// ---------------------------------------------------------------------------

/// External collaborator that knows which sites belong to an order.
pub trait SiteManager: Send + Sync {
    /// Sites provisioned for `order_id`. Unknown orders yield an empty list,
    /// never an error.
    fn get_order_sites(&self, order_id: u64) -> Result<Vec<ProvisionedSite>>;
}

/// YAML-file registry at `.sitebridge/sites.yaml`.
pub struct FileSiteManager {
    path: PathBuf,
}

impl FileSiteManager {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::sites_path(root),
        }
    }

    /// Every registered site. A missing or empty file reads as an empty
    /// registry.
    pub fn load_all(&self) -> Result<Vec<ProvisionedSite>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn append(&self, site: ProvisionedSite) -> Result<()> {
        let mut sites = self.load_all()?;
        sites.push(site);
        let data = serde_yaml::to_string(&sites)?;
        crate::io::atomic_write(&self.path, data.as_bytes())
    }
}

impl SiteManager for FileSiteManager {
    fn get_order_sites(&self, order_id: u64) -> Result<Vec<ProvisionedSite>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|s| s.order_id == order_id)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
