pub mod config;
pub mod intent;
pub mod sites;
