mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, sites::SitesSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sitebridge",
    about = "Storefront gateway that tracks site-upgrade intent and decorates shop pages",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .sitebridge/ or .git/)
    #[arg(long, global = true, env = "SITEBRIDGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize sitebridge in the current project
    Init,

    /// Run the gateway server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "4920")]
        port: u16,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },

    /// Inspect and modify the gateway configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect and register provisioned sites
    Sites {
        #[command(subcommand)]
        subcommand: SitesSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Sites { subcommand } => cmd::sites::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
