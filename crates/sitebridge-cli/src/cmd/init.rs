use anyhow::Context;
use sitebridge_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "storefront".to_string());

    println!("Initializing sitebridge in: {}", root.display());

    let bridge_dir = paths::bridge_dir(root);
    io::ensure_dir(&bridge_dir)
        .with_context(|| format!("failed to create {}", bridge_dir.display()))?;

    // config.yaml, if missing
    if !paths::config_path(root).exists() {
        let cfg = Config::new(&project_name);
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    // empty site registry, if missing
    let created = io::write_if_missing(&paths::sites_path(root), b"[]\n")
        .context("failed to write sites.yaml")?;
    if created {
        println!("  created: {}", paths::SITES_FILE);
    } else {
        println!("  exists:  {}", paths::SITES_FILE);
    }

    println!("\nsitebridge initialized for '{project_name}'.");
    println!("Next: sitebridge serve");

    Ok(())
}
