use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sitebridge_core::config::{Config, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the current configuration
    Show,

    /// Turn the site_id upgrade parameter on or off
    SetUpgradeParam {
        /// on or off
        state: String,
    },

    /// Point the gateway at a storefront upstream (http:// or https://)
    SetUpstream {
        /// Upstream origin, e.g. https://shop.example.com
        url: String,
    },

    /// Remove the upstream; the built-in placeholder storefront serves instead
    ClearUpstream,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::SetUpgradeParam { state } => set_upgrade_param(root, &state),
        ConfigSubcommand::SetUpstream { url } => set_upstream(root, Some(url)),
        ConfigSubcommand::ClearUpstream => set_upstream(root, None),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    println!("Project:           {}", config.project.name);
    println!(
        "Upgrade parameter: {}",
        if config.upgrade.use_site_id_parameter {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("Session capacity:  {}", config.upgrade.session_capacity);
    match &config.storefront.upstream {
        Some(upstream) => println!("Upstream:          {upstream}"),
        None => println!("Upstream:          (none; placeholder storefront)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// set-upgrade-param
// ---------------------------------------------------------------------------

fn set_upgrade_param(root: &Path, state: &str) -> anyhow::Result<()> {
    let enabled = match state {
        "on" => true,
        "off" => false,
        other => anyhow::bail!("invalid state '{other}'; valid: on, off"),
    };

    let mut config = Config::load(root).context("failed to load config")?;
    config.upgrade.use_site_id_parameter = enabled;
    config.save(root).context("failed to save config")?;

    if enabled {
        println!("Upgrade parameter enabled.");
    } else {
        println!("Upgrade parameter disabled; site_id query values will be ignored.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// set-upstream / clear-upstream
// ---------------------------------------------------------------------------

fn set_upstream(root: &Path, url: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    config.set_upstream(url)?;
    config.save(root).context("failed to save config")?;

    match &config.storefront.upstream {
        Some(upstream) => println!("Upstream set to {upstream}."),
        None => println!("Upstream cleared; serving the placeholder storefront."),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
