use anyhow::{anyhow, Result};
use sitebridge_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: u16, no_open: bool) -> Result<()> {
    let config = Config::load(root).map_err(|e| anyhow!("{e}"))?;
    let name = config.project.name.clone();

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        let url = format!("http://localhost:{actual_port}");

        println!("sitebridge gateway for '{name}' → {url}");

        tokio::select! {
            res = sitebridge_server::serve_on(root_buf, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
