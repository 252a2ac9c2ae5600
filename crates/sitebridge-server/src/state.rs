use sitebridge_core::config::Config;
use sitebridge_core::session::SessionStore;
use sitebridge_core::site::{FileSiteManager, SiteManager};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    /// Runtime-mutable config; PATCH /api/config writes here after persisting.
    pub config: Arc<RwLock<Config>>,
    pub sessions: Arc<SessionStore>,
    pub sites: Arc<dyn SiteManager>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(root: PathBuf, config: Config) -> Self {
        let sessions = Arc::new(SessionStore::new(config.upgrade.session_capacity));
        let state = Self {
            root: root.clone(),
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::clone(&sessions),
            sites: Arc::new(FileSiteManager::new(&root)),
            http_client: reqwest::Client::new(),
        };

        // Drop sessions idle past the intent-cookie lifetime. Spawning needs
        // a runtime; sync unit tests construct state without one.
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_secs(600)).await;
                    let dropped = sessions.prune(chrono::Duration::hours(24));
                    if dropped > 0 {
                        tracing::debug!(dropped, "pruned idle sessions");
                    }
                }
            });
        }

        state
    }
}
