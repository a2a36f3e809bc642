//! Coordinator binary

use clap::{Parser, Subcommand};
use shardfs::{Config, Coordinator};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardfs-coord")]
#[command(about = "shardfs coordinator: splits files across storage nodes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Config file, TOML or legacy .txt/.properties (defaults to $SHARDFS_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured listen address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let config = Config::load(config.as_deref())?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            // CLI has priority over the file
            let mut coord_config = config.coordinator()?;
            if let Some(bind) = bind {
                coord_config.bind_addr = bind;
            }

            let coord = Coordinator::new(coord_config)?;
            tokio::select! {
                res = coord.serve() => res?,
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down coordinator"),
            }
        }
    }

    Ok(())
}
