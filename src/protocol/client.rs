//! Client for the shardfs wire protocol
//!
//! The same client talks to a coordinator (file names) and to a storage node
//! (shard names); the two links share opcodes and framing. Each call opens a
//! fresh connection, performs one exchange and drops it.

use crate::common::{Error, Result};
use crate::protocol::frame::{
    copy_exact, payload_len, read_bool, read_names, read_size, NOT_FOUND,
};
use crate::protocol::message::Request;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<BufStream<TcpStream>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| Error::ConnectionFailed {
                addr: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(BufStream::new(stream))
    }

    /// Connect and write a request header, leaving the stream open.
    async fn send(&self, request: &Request) -> Result<BufStream<TcpStream>> {
        let mut conn = self.connect().await?;
        request.write_to(&mut conn).await?;
        Ok(conn)
    }

    /// Connectivity probe. Succeeds once the peer accepted the connection.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.send(&Request::Ping).await?;
        conn.flush().await?;
        // The peer may already have closed its side
        let _ = conn.shutdown().await;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let mut conn = self.send(&Request::List).await?;
        conn.flush().await?;
        read_names(&mut conn).await
    }

    /// Stream exactly `size` bytes from `payload` under `name`.
    pub async fn upload<R>(&self, name: &str, size: u64, payload: &mut R) -> Result<bool>
    where
        R: AsyncRead + Unpin,
    {
        let wire_size = i64::try_from(size).map_err(|_| Error::InvalidSize(i64::MAX))?;
        let request = Request::Upload {
            name: name.to_string(),
            size: wire_size,
        };
        let mut conn = self.send(&request).await?;
        copy_exact(payload, &mut conn, size).await?;
        conn.flush().await?;
        read_bool(&mut conn).await
    }

    pub async fn upload_bytes(&self, name: &str, data: &[u8]) -> Result<bool> {
        let mut payload = data;
        self.upload(name, data.len() as u64, &mut payload).await
    }

    /// Fetch `name` into `sink`. Returns `None` when the peer reports it
    /// absent, otherwise the number of bytes written.
    pub async fn download_to<W>(&self, name: &str, sink: &mut W) -> Result<Option<u64>>
    where
        W: AsyncWrite + Unpin,
    {
        let request = Request::Download {
            name: name.to_string(),
        };
        let mut conn = self.send(&request).await?;
        conn.flush().await?;

        let size = read_size(&mut conn).await?;
        if size == NOT_FOUND {
            return Ok(None);
        }
        let len = payload_len(size)?;
        copy_exact(&mut conn, sink, len).await?;
        sink.flush().await?;
        Ok(Some(len))
    }

    pub async fn download(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut data = Vec::new();
        let found = self.download_to(name, &mut data).await?;
        Ok(found.map(|_| data))
    }

    pub async fn remove(&self, name: &str) -> Result<bool> {
        let request = Request::Remove {
            name: name.to_string(),
        };
        let mut conn = self.send(&request).await?;
        conn.flush().await?;
        read_bool(&mut conn).await
    }
}
