//! Storage node server

use crate::common::{format_bytes, Error, NodeConfig, Result};
use crate::node::store::ShardStore;
use crate::protocol::frame::{
    copy_exact, payload_len, write_bool, write_names, write_size, NOT_FOUND,
};
use crate::protocol::server::serve_connections;
use crate::protocol::Request;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};

pub struct StorageNode {
    config: NodeConfig,
}

impl StorageNode {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let store = Arc::new(ShardStore::open(&self.config.data_dir).await?);

        tracing::info!("Starting storage node");
        tracing::info!("  Listening on: {}", listener.local_addr()?);
        tracing::info!("  Data path: {}", store.root().display());

        serve_connections(listener, move |socket| {
            let store = store.clone();
            async move { handle_connection(socket, &store).await }
        })
        .await
    }
}

async fn handle_connection(socket: TcpStream, store: &ShardStore) -> Result<()> {
    socket.set_nodelay(true)?;
    let mut conn = BufStream::new(socket);

    match Request::read_from(&mut conn).await? {
        Request::Ping => tracing::debug!("Ping"),

        Request::List => {
            let names = store.list().await?;
            write_names(&mut conn, &names).await?;
            tracing::debug!("Listed {} shards", names.len());
        }

        Request::Upload { name, size } => {
            let stored = match payload_len(size) {
                Ok(len) => match store.write(&name, len, &mut conn).await {
                    Ok(_) => {
                        tracing::info!("Stored {} ({})", name, format_bytes(len));
                        true
                    }
                    Err(e @ Error::InvalidName(_)) => {
                        // Nothing was read yet, drain so the sender sees our answer
                        copy_exact(&mut conn, &mut tokio::io::sink(), len).await?;
                        tracing::warn!("Rejected upload: {}", e);
                        false
                    }
                    Err(e) => {
                        tracing::warn!("Failed to store {}: {}", name, e);
                        false
                    }
                },
                Err(e) => {
                    tracing::warn!("Rejected upload of {}: {}", name, e);
                    false
                }
            };
            write_bool(&mut conn, stored).await?;
        }

        Request::Download { name } => match store.open_shard(&name).await {
            Ok(Some((mut file, len))) => {
                write_size(&mut conn, len as i64).await?;
                copy_exact(&mut file, &mut conn, len).await?;
                tracing::info!("Sent {} ({})", name, format_bytes(len));
            }
            Ok(None) => {
                write_size(&mut conn, NOT_FOUND).await?;
                tracing::info!("Shard not found: {}", name);
            }
            Err(e) => {
                write_size(&mut conn, NOT_FOUND).await?;
                tracing::warn!("Failed to open {}: {}", name, e);
            }
        },

        Request::Remove { name } => {
            let removed = store.remove(&name).await.unwrap_or_else(|e| {
                tracing::warn!("Failed to remove {}: {}", name, e);
                false
            });
            write_bool(&mut conn, removed).await?;
            if removed {
                tracing::info!("Removed {}", name);
            } else {
                tracing::info!("Nothing removed for {}", name);
            }
        }
    }

    conn.flush().await?;
    Ok(())
}
