//! tunnelkit CLI
//!
//! Exposes a local web application through the ngrok agent:
//! - start: make sure the agent runs and a tunnel to the app exists
//! - stop: terminate the agent this tool started
//! - list / status: inspect the agent and its tunnels

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tk_core::config::{self, ConfigFile};
use tunnelkit::commands::{self, StartOptions};

#[derive(Parser)]
#[command(name = "tunnelkit")]
#[command(author, version, about = "Start and reuse ngrok tunnels for a local web application")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent if needed and create or reuse a tunnel
    Start {
        /// Local port of the web application (overrides config)
        #[arg(short, long, env = "TUNNELKIT_PORT")]
        port: Option<u16>,
        /// Requested public subdomain
        #[arg(short, long, env = "TUNNELKIT_SUBDOMAIN")]
        subdomain: Option<String>,
        /// Tunnel name (defaults to <host>-<port>)
        #[arg(short, long)]
        name: Option<String>,
        /// Path to the ngrok executable (overrides config and PATH)
        #[arg(long, env = "TUNNELKIT_AGENT_PATH")]
        agent_path: Option<PathBuf>,
        /// Keep running and stop the agent on Ctrl+C
        #[arg(short, long)]
        wait: bool,
    },

    /// Stop the agent started by tunnelkit
    Stop {
        /// Also kill every process named like the agent
        #[arg(long)]
        sweep: bool,
    },

    /// List tunnels known to the agent
    List {
        /// Show detailed information
        #[arg(short, long)]
        long: bool,
    },

    /// Show agent installation and control API status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Start {
            port,
            subdomain,
            name,
            agent_path,
            wait,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let options = StartOptions {
                port,
                subdomain,
                name,
                agent_path,
                wait,
            };
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(cancel.clone()));
            commands::start_command(config, options, cancel).await?;
        }

        Commands::Stop { sweep } => {
            let config = load_config(cli.config.as_ref())?;
            commands::stop_command(config.agent, sweep).await?;
        }

        Commands::List { long } => {
            let config = load_config(cli.config.as_ref())?;
            commands::list_command(&config.agent, long).await?;
        }

        Commands::Status => {
            let config = load_config(cli.config.as_ref())?;
            commands::status_command(config.agent).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config_show(cli.config.as_ref())?;
            }
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(config::default_config_path);
                println!("{}", path.display());
            }
            ConfigAction::Init { force } => {
                commands::config_init(cli.config.as_ref(), force)?;
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile> {
    config::load_or_default(path.map(PathBuf::as_path)).with_context(|| match path {
        Some(p) => format!("Failed to load config from {:?}", p),
        None => format!(
            "Failed to load config from {:?}",
            config::default_config_path()
        ),
    })
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel.cancel();
}
