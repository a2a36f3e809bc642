//! CLI client for a shardfs coordinator

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shardfs::common::format_bytes;
use shardfs::{Client, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shardfs")]
#[command(about = "shardfs sharded file store CLI")]
#[command(version)]
struct Cli {
    /// Coordinator address
    #[arg(long, default_value = "localhost:5000")]
    coordinator: String,

    /// Config file (download directory); defaults to $SHARDFS_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the coordinator accepts connections
    Ping,

    /// List stored files
    List,

    /// Upload a file
    Upload {
        /// Local file
        file: PathBuf,

        /// Stored name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a file
    Download {
        /// Stored name
        name: String,

        /// Output path (defaults to <download dir>/<name>)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Remove a file from every storage node
    Remove {
        /// Stored name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = Client::new(cli.coordinator.clone());

    match cli.command {
        Commands::Ping => {
            client.ping().await?;
            println!("Connected to {}", client.addr());
        }

        Commands::List => {
            let mut files = client.list().await?;
            files.sort();
            println!("Available files ({}):", files.len());
            for file in files {
                println!("  {}", file);
            }
        }

        Commands::Upload { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("cannot derive a name from {}", file.display()))?,
            };
            let mut source = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("cannot open {}", file.display()))?;
            let size = source.metadata().await?.len();

            if !client.upload(&name, size, &mut source).await? {
                bail!("upload of {} failed", name);
            }
            println!("Uploaded {} ({})", name, format_bytes(size));
        }

        Commands::Download { name, output } => {
            let output = match output {
                Some(path) => path,
                None => {
                    let config = Config::load(cli.config.as_deref())?;
                    config.download_dir.join(&name)
                }
            };
            let dir = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            tokio::fs::create_dir_all(&dir).await?;

            // Only replace the destination once the whole file arrived
            let staging = tempfile::NamedTempFile::new_in(&dir)?;
            let mut sink = tokio::fs::File::from_std(staging.reopen()?);
            match client.download_to(&name, &mut sink).await? {
                Some(size) => {
                    drop(sink);
                    staging.persist(&output)?;
                    println!(
                        "Downloaded {} ({}) to {}",
                        name,
                        format_bytes(size),
                        output.display()
                    );
                }
                None => bail!("file not found: {}", name),
            }
        }

        Commands::Remove { name } => {
            if !client.remove(&name).await? {
                bail!("removal of {} incomplete", name);
            }
            println!("Removed {}", name);
        }
    }

    Ok(())
}
