use crate::error::{BridgeError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// UpgradeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Master switch for the whole site-upgrade-intent mechanism: capture,
    /// retrieval, banner, and explicit clear all sit behind it.
    #[serde(default = "default_use_site_id_parameter")]
    pub use_site_id_parameter: bool,
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

fn default_use_site_id_parameter() -> bool {
    true
}

fn default_session_capacity() -> usize {
    10_000
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            use_site_id_parameter: default_use_site_id_parameter(),
            session_capacity: default_session_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorefrontConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorefrontConfig {
    /// Upstream origin to reverse-proxy, e.g. "https://shop.example.com".
    /// When unset, the built-in placeholder pages are served instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub upgrade: UpgradeConfig,
    #[serde(default)]
    pub storefront: StorefrontConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            upgrade: UpgradeConfig::default(),
            storefront: StorefrontConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BridgeError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Set (or clear, with `None`) the storefront upstream. Accepts only
    /// http(s) origins; a trailing slash is trimmed so path joining in the
    /// proxy stays predictable.
    pub fn set_upstream(&mut self, upstream: Option<String>) -> Result<()> {
        match upstream {
            None => {
                self.storefront.upstream = None;
                Ok(())
            }
            Some(url) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(BridgeError::InvalidUpstream(url));
                }
                self.storefront.upstream = Some(url.trim_end_matches('/').to_string());
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.project.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.name is empty".to_string(),
            });
        }

        if let Some(upstream) = &self.storefront.upstream {
            if !upstream.starts_with("http://") && !upstream.starts_with("https://") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "storefront.upstream '{}' must start with http:// or https://",
                        upstream
                    ),
                });
            } else if upstream.ends_with('/') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "storefront.upstream '{}' has a trailing slash",
                        upstream
                    ),
                });
            }
        }

        if self.upgrade.session_capacity == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "upgrade.session_capacity is 0: upgrade intents will be \
                          carried by the cookie channel only"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("demo-shop");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "demo-shop");
        assert_eq!(parsed.version, 1);
        assert!(parsed.upgrade.use_site_id_parameter);
        assert_eq!(parsed.upgrade.session_capacity, 10_000);
        assert!(parsed.storefront.upstream.is_none());
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let yaml = "version: 1\nproject:\n  name: my-shop\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.upgrade.use_site_id_parameter);
        assert!(cfg.storefront.upstream.is_none());
    }

    #[test]
    fn flag_can_be_disabled_in_yaml() {
        let yaml = "version: 1\nproject:\n  name: my-shop\nupgrade:\n  use_site_id_parameter: false\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!cfg.upgrade.use_site_id_parameter);
        // the other upgrade field still defaults
        assert_eq!(cfg.upgrade.session_capacity, 10_000);
    }

    #[test]
    fn unset_upstream_not_serialized() {
        let cfg = Config::new("my-shop");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(!yaml.contains("upstream"));
    }

    #[test]
    fn load_missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        match Config::load(dir.path()) {
            Err(BridgeError::NotInitialized) => {}
            other => panic!("expected NotInitialized, got {other:?}"),
        }
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("my-shop");
        cfg.upgrade.use_site_id_parameter = false;
        cfg.set_upstream(Some("https://shop.example.com".to_string()))
            .unwrap();
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "my-shop");
        assert!(!loaded.upgrade.use_site_id_parameter);
        assert_eq!(
            loaded.storefront.upstream.as_deref(),
            Some("https://shop.example.com")
        );
    }

    #[test]
    fn set_upstream_rejects_other_schemes() {
        let mut cfg = Config::new("my-shop");
        let err = cfg
            .set_upstream(Some("ftp://shop.example.com".to_string()))
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUpstream(_)));
        assert!(cfg.storefront.upstream.is_none());
    }

    #[test]
    fn set_upstream_trims_trailing_slash() {
        let mut cfg = Config::new("my-shop");
        cfg.set_upstream(Some("https://shop.example.com/".to_string()))
            .unwrap();
        assert_eq!(
            cfg.storefront.upstream.as_deref(),
            Some("https://shop.example.com")
        );
        cfg.set_upstream(None).unwrap();
        assert!(cfg.storefront.upstream.is_none());
    }

    #[test]
    fn validate_default_config_no_warnings() {
        let cfg = Config::new("my-shop");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_upstream() {
        let mut cfg = Config::new("my-shop");
        cfg.storefront.upstream = Some("shop.example.com".to_string());
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("http")));
    }

    #[test]
    fn validate_flags_zero_capacity() {
        let mut cfg = Config::new("my-shop");
        cfg.upgrade.session_capacity = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("session_capacity")));
    }
}
