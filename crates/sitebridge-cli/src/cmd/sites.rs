use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::Utc;
use clap::{Args, Subcommand};
use sitebridge_core::config::Config;
use sitebridge_core::site::{
    FileSiteManager, ProvisionedSite, SiteAction, SiteManager, SiteStatus,
};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum SitesSubcommand {
    /// List registered sites
    List {
        /// Only sites belonging to this order
        #[arg(long)]
        order: Option<u64>,
    },

    /// Register a provisioned site against an order
    Add(AddSiteArgs),
}

#[derive(Args)]
pub struct AddSiteArgs {
    /// Order the site belongs to
    #[arg(long)]
    pub order: u64,

    /// Provisioned site id
    #[arg(long)]
    pub site: u64,

    /// Public URL of the site
    #[arg(long)]
    pub url: String,

    /// Admin login URL
    #[arg(long)]
    pub admin_url: String,

    /// Admin username
    #[arg(long)]
    pub username: String,

    /// One-time password shown on the order page until first login
    #[arg(long)]
    pub password: Option<String>,

    /// created or upgraded
    #[arg(long, default_value = "created")]
    pub action: String,

    /// provisioning, active, or failed
    #[arg(long, default_value = "active")]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: SitesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SitesSubcommand::List { order } => list(root, order, json),
        SitesSubcommand::Add(args) => add(root, args),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, order: Option<u64>, json: bool) -> anyhow::Result<()> {
    Config::load(root).context("failed to load config")?;

    let mgr = FileSiteManager::new(root);
    let sites = match order {
        Some(id) => mgr.get_order_sites(id)?,
        None => mgr.load_all()?,
    };

    if json {
        return print_json(&sites);
    }

    if sites.is_empty() {
        match order {
            Some(id) => println!("No sites registered for order {id}."),
            None => println!("No sites registered."),
        }
        return Ok(());
    }

    let headers = &["SITE", "ORDER", "URL", "ACTION", "STATUS", "CREATED"];
    let rows: Vec<Vec<String>> = sites
        .iter()
        .map(|s| {
            vec![
                s.site_id.to_string(),
                s.order_id.to_string(),
                s.url.clone(),
                s.action.to_string(),
                s.status.to_string(),
                s.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ]
        })
        .collect();
    print_table(headers, rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

fn add(root: &Path, args: AddSiteArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.order > 0, "--order must be a positive id");
    anyhow::ensure!(args.site > 0, "--site must be a positive id");

    Config::load(root).context("failed to load config")?;

    let action: SiteAction = args.action.parse()?;
    let status: SiteStatus = args.status.parse()?;

    let mgr = FileSiteManager::new(root);
    mgr.append(ProvisionedSite {
        site_id: args.site,
        order_id: args.order,
        url: args.url,
        admin_url: args.admin_url,
        username: args.username,
        password: args.password,
        status,
        action,
        created_at: Utc::now(),
    })
    .context("failed to write sites.yaml")?;

    println!(
        "Registered site {} ({action}) for order {}.",
        args.site, args.order
    );
    Ok(())
}
