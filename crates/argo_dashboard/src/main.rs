//! Argo Dashboard CLI
//!
//! Runs a scripted dashboard session and prints the rendered tree.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use argo_dashboard::config::CONFIG_FILE;
use argo_dashboard::state::format_currency;
use argo_dashboard::{Dashboard, DashboardConfig};

#[derive(Parser)]
#[command(name = "argo-dash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Driver earnings dashboard", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./argo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the dashboard, apply inputs and print the result
    Run {
        /// Inputs as `path=value`, e.g. `platforms.gojek=150000 fuel.jarak=80`
        inputs: Vec<String>,

        /// Print the rendered tree instead of the summary
        #[arg(long)]
        tree: bool,
    },

    /// Write a default argo.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { inputs, tree } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_run(&config, &inputs, tree)
        }
        Commands::Init { force } => cmd_init(force),
        Commands::Config => {
            let config = load_config(cli.config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::load(path),
        None => DashboardConfig::load_from_dir(Path::new(".")),
    }
}

fn parse_input(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(path, value)| (path.trim(), value.trim()))
        .with_context(|| format!("Invalid input `{}`, expected path=value", raw))
}

fn cmd_run(config: &DashboardConfig, inputs: &[String], tree: bool) -> Result<()> {
    let mut dashboard = Dashboard::new(config);
    dashboard.mount().context("Failed to mount dashboard")?;

    for raw in inputs {
        let (path, value) = parse_input(raw)?;
        if !dashboard.input(path, value) {
            warn!("no input field for {}", path);
        }
    }

    if tree {
        println!("{}", dashboard.render_to_string());
    } else {
        let results = dashboard.results();
        let currency = &config.settings.currency;
        println!("Total kotor : {}", format_currency(currency, results.total_kotor));
        println!("Biaya bensin: {}", format_currency(currency, results.biaya_bensin));
        println!("Bersih      : {}", format_currency(currency, results.bersih));
    }

    let stats = dashboard.stats();
    info!(
        "{} bus topics, {} state subscriptions",
        stats.bus.topic_count, stats.state_subscriptions
    );
    dashboard.unmount();
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", CONFIG_FILE);
    }
    let content = DashboardConfig::default().to_toml()?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
    info!("Created {}", CONFIG_FILE);
    Ok(())
}
