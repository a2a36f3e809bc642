//! Storage node binary

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shardfs::common::NodeConfig;
use shardfs::{Config, StorageNode};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardfs-node")]
#[command(about = "shardfs storage node: keeps shards in a local directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start storage node server
    Serve {
        /// Config file (defaults to $SHARDFS_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node number in the config (1-based, matches the shard suffix)
        #[arg(short, long)]
        number: Option<usize>,

        /// Listen address (overrides the config)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Storage directory (overrides the config)
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            number,
            bind,
            data,
        } => {
            let config = Config::load(config.as_deref())?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let node_config = match (number, bind, data) {
                (Some(number), bind, data) => {
                    let mut node_config = config.storage_node(number)?;
                    if let Some(bind) = bind {
                        node_config.bind_addr = bind;
                    }
                    if let Some(data) = data {
                        node_config.data_dir = data;
                    }
                    node_config
                }
                (None, Some(bind_addr), Some(data_dir)) => NodeConfig {
                    bind_addr,
                    data_dir,
                },
                (None, _, _) => bail!("either --number or both --bind and --data are required"),
            };

            let node = StorageNode::new(node_config);
            tokio::select! {
                res = node.serve() => res?,
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down storage node"),
            }
        }
    }

    Ok(())
}
