use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("not initialized: run 'sitebridge init'")]
    NotInitialized,

    #[error("invalid site status: {0}")]
    InvalidSiteStatus(String),

    #[error("invalid site action: {0}")]
    InvalidSiteAction(String),

    #[error("invalid upstream URL '{0}': must start with http:// or https://")]
    InvalidUpstream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
