pub mod config;
pub mod error;
pub mod intent;
pub mod io;
pub mod page;
pub mod paths;
pub mod session;
pub mod site;

pub use error::{BridgeError, Result};
