//! Coordinator server

use crate::common::{format_bytes, CoordinatorConfig, Error, Result};
use crate::coordinator::distributor::Distributor;
use crate::protocol::frame::{payload_len, write_bool, write_names, write_size, NOT_FOUND};
use crate::protocol::server::serve_connections;
use crate::protocol::Request;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Fails if no storage nodes are configured.
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        if config.storage_nodes.is_empty() {
            return Err(Error::NoStorageNodes);
        }
        Ok(Self { config })
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  Listening on: {}", listener.local_addr()?);
        tracing::info!("  Storage nodes: {}", self.config.shard_count());
        for (i, node) in self.config.storage_nodes.iter().enumerate() {
            tracing::info!("    #{} {} ({})", i + 1, node.addr(), node.directory.display());
        }

        let distributor = Arc::new(Distributor::new(&self.config));
        serve_connections(listener, move |socket| {
            let distributor = distributor.clone();
            async move { handle_connection(socket, &distributor).await }
        })
        .await
    }
}

async fn handle_connection(socket: TcpStream, distributor: &Distributor) -> Result<()> {
    socket.set_nodelay(true)?;
    let mut conn = BufStream::new(socket);

    match Request::read_from(&mut conn).await? {
        Request::Ping => tracing::info!("Connectivity probe"),

        Request::List => {
            let files = distributor.list().await;
            write_names(&mut conn, &files).await?;
            tracing::info!("Listed {} files", files.len());
        }

        Request::Upload { name, size } => {
            let distributed = match payload_len(size) {
                Ok(len) => match distributor.upload(&name, len, &mut conn).await {
                    Ok(()) => {
                        tracing::info!(
                            "Distributed {} ({}) across {} nodes",
                            name,
                            format_bytes(len),
                            distributor.shard_count()
                        );
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Upload of {} failed: {}", name, e);
                        false
                    }
                },
                Err(e) => {
                    tracing::warn!("Rejected upload of {}: {}", name, e);
                    false
                }
            };
            write_bool(&mut conn, distributed).await?;
        }

        Request::Download { name } => match distributor.download(&name).await {
            Ok(Some(file)) => {
                let len = file.len();
                write_size(&mut conn, len as i64).await?;
                file.write_to(&mut conn).await?;
                tracing::info!("Sent {} ({})", name, format_bytes(len));
            }
            Ok(None) => {
                write_size(&mut conn, NOT_FOUND).await?;
            }
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", name, e);
                write_size(&mut conn, NOT_FOUND).await?;
            }
        },

        Request::Remove { name } => {
            let removed = distributor.remove(&name).await;
            write_bool(&mut conn, removed).await?;
            if removed {
                tracing::info!("Removed {}", name);
            } else {
                tracing::warn!("Removal of {} incomplete", name);
            }
        }
    }

    conn.flush().await?;
    Ok(())
}
