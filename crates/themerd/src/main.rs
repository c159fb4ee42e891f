//! Konsole Theme Daemon - keeps Konsole profiles in step with the desktop
//!
//! Watches kdeglobals and switches every running Konsole session, plus the
//! default for new windows, between the light and dark profiles.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use themer_common::{ProfileName, ThemerConfig};
use themerd::applicator::{KwriteconfigStore, ProfileApplicator};
use themerd::appearance::{KreadconfigSource, ModeResolver};
use themerd::discovery;
use themerd::konsole::QdbusKonsoleBus;
use themerd::reconcile::Reconciler;
use themerd::signals::shutdown_signal;
use themerd::watcher::ChangeWatcher;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "themerd")]
#[command(about = "Switch Konsole profiles with the KDE light/dark colour scheme", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/konsole-themer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the current theme, then follow changes until interrupted
    Watch,

    /// Apply a profile to every running session once and exit
    Apply {
        /// Profile to apply instead of the one matching the colour scheme
        #[arg(long)]
        profile: Option<String>,
    },

    /// Show the detected colour scheme, target profile and live sessions
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(ThemerConfig::default_path);
    let config = ThemerConfig::load(&config_path).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch(&config).await,
        Commands::Apply { profile } => apply(&config, profile).await,
        Commands::Status => status(&config).await,
    }
}

fn build_resolver(config: &ThemerConfig) -> ModeResolver {
    let source = KreadconfigSource::new(&config.appearance, config.ipc_timeout());
    ModeResolver::new(Arc::new(source), config.classifier(), config.profile_map())
}

fn build_reconciler(config: &ThemerConfig) -> Reconciler {
    let bus = QdbusKonsoleBus::new(&config.terminal);
    let store = KwriteconfigStore::new(&config.default_profile, config.ipc_timeout());
    let applicator = ProfileApplicator::new(Arc::new(bus), Arc::new(store), config.ipc_timeout());
    Reconciler::new(Arc::new(applicator))
}

async fn watch(config: &ThemerConfig) -> Result<()> {
    info!("Konsole Theme Switcher v{} starting...", env!("CARGO_PKG_VERSION"));

    let watcher = ChangeWatcher::new(
        build_resolver(config),
        build_reconciler(config),
        config.watch.file.clone(),
        config.debounce_window(),
    )?;

    watcher
        .run(shutdown_signal())
        .await
        .with_context(|| format!("Failed to watch {}", config.watch.file.display()))?;

    Ok(())
}

async fn apply(config: &ThemerConfig, profile: Option<String>) -> Result<()> {
    let profile = match profile {
        Some(name) => ProfileName::new(name),
        None => build_resolver(config).resolve().await,
    };
    info!("Setting '{}' profile...", profile);

    build_reconciler(config).reconcile(&profile).await;
    Ok(())
}

async fn status(config: &ThemerConfig) -> Result<()> {
    let resolution = build_resolver(config).resolve_detailed().await;
    let scheme = if resolution.scheme.is_empty() {
        "(unknown)"
    } else {
        resolution.scheme.as_str()
    };
    println!("Colour scheme: {}", scheme);
    println!("Mode:          {}", resolution.mode);
    println!("Profile:       {}", resolution.profile);
    println!("Watching:      {}", config.watch.file.display());

    let bus = QdbusKonsoleBus::new(&config.terminal);
    let targets = discovery::list_targets(&bus, config.ipc_timeout()).await;
    println!("Sessions:      {}", targets.len());
    for target in &targets {
        println!("  {}", target);
    }

    Ok(())
}
