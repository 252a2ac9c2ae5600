use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BRIDGE_DIR: &str = ".sitebridge";

pub const CONFIG_FILE: &str = ".sitebridge/config.yaml";
pub const SITES_FILE: &str = ".sitebridge/sites.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn bridge_dir(root: &Path) -> PathBuf {
    root.join(BRIDGE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn sites_path(root: &Path) -> PathBuf {
    root.join(SITES_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
