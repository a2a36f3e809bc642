//! Fan-out of file operations to the storage nodes
//!
//! Every file operation becomes one shard operation per node. The per-shard
//! operations run concurrently and are joined before the coordinator replies:
//!
//! - UPLOAD: the payload is spooled to a temp file first, then every shard
//!   streams its own byte range from it. Any failed shard fails the upload.
//!   Shards already written elsewhere stay in place (no rollback).
//! - DOWNLOAD: each shard is fetched into its own temp file. The first
//!   missing or failed shard aborts the download and drops the remaining
//!   node connections.
//! - LIST: union of the logical names reported by every reachable node.
//! - REMOVE: attempted on every node; succeeds only if every shard was
//!   removed.

use crate::common::{CoordinatorConfig, Error, Result, StorageNodeEndpoint};
use crate::coordinator::placement::{logical_name, shard_name, ShardPlan, ShardSpan};
use crate::protocol::frame::copy_exact;
use crate::protocol::Client;
use futures_util::future::{join_all, try_join_all};
use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufWriter};

const SPOOL_PREFIX: &str = "shardfs-";

pub struct Distributor {
    nodes: Arc<[StorageNodeEndpoint]>,
    spool_dir: Option<PathBuf>,
}

impl Distributor {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            nodes: config.storage_nodes.clone(),
            spool_dir: config.spool_dir.clone(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.nodes.len()
    }

    /// Split `size` bytes read from `payload` into shards and store one on
    /// each node.
    pub async fn upload<R>(&self, name: &str, size: u64, payload: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let plan = ShardPlan::new(name, size, self.nodes.len())?;

        // The client's bytes must be consumed before the shards can be sent
        // concurrently, so stage them on disk first.
        let spool = self.named_spool()?;
        {
            let mut writer = BufWriter::new(File::from_std(spool.reopen()?));
            copy_exact(payload, &mut writer, size).await?;
            writer.flush().await?;
        }
        tracing::debug!("Spooled {} bytes of {}", size, name);

        let results = join_all(
            plan.spans()
                .iter()
                .map(|span| self.upload_shard(&plan, span, spool.path())),
        )
        .await;

        let mut failures = results.into_iter().filter_map(|r| r.err());
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                tracing::warn!("{}", first);
                for other in failures {
                    tracing::warn!("{}", other);
                }
                Err(first)
            }
        }
    }

    async fn upload_shard(&self, plan: &ShardPlan, span: &ShardSpan, spool: &Path) -> Result<()> {
        let node = &self.nodes[span.index - 1];
        let shard = plan.shard_name(span);

        let send = async {
            let mut file = File::open(spool).await?;
            file.seek(SeekFrom::Start(span.offset)).await?;
            Client::new(node.addr())
                .upload(&shard, span.len, &mut file)
                .await
        };
        match send.await {
            Ok(true) => {
                tracing::debug!("Shard {} stored on {}", shard, node.addr());
                Ok(())
            }
            Ok(false) => Err(shard_error(&shard, node, "node reported failure")),
            Err(e) => Err(shard_error(&shard, node, e)),
        }
    }

    /// Fetch every shard of `name`. `None` if any shard is missing.
    pub async fn download(&self, name: &str) -> Result<Option<Reconstruction>> {
        let fetches = (1..=self.nodes.len()).map(|index| self.fetch_shard(name, index));

        match try_join_all(fetches).await {
            Ok(parts) => Ok(Some(Reconstruction { parts })),
            Err(e) if e.is_not_found() => {
                tracing::info!("{} unavailable: {}", name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_shard(&self, name: &str, index: usize) -> Result<ShardPart> {
        let node = &self.nodes[index - 1];
        let shard = shard_name(name, index);
        let mut file = self.anonymous_spool()?;

        match Client::new(node.addr()).download_to(&shard, &mut file).await {
            Ok(Some(len)) => {
                tracing::debug!("Fetched {} ({} bytes) from {}", shard, len, node.addr());
                Ok(ShardPart { file, len })
            }
            Ok(None) => Err(Error::NotFound(shard)),
            Err(e) => Err(shard_error(&shard, node, e)),
        }
    }

    /// Logical file names known to any reachable node.
    pub async fn list(&self) -> HashSet<String> {
        let listings = join_all(self.nodes.iter().map(|node| async move {
            (node, Client::new(node.addr()).list().await)
        }))
        .await;

        let mut files = HashSet::new();
        for (node, listing) in listings {
            match listing {
                Ok(shards) => {
                    files.extend(shards.iter().map(|shard| logical_name(shard).to_string()))
                }
                Err(e) => tracing::warn!("Skipping {} in listing: {}", node.addr(), e),
            }
        }
        files
    }

    /// Remove every shard of `name`. `true` only if all nodes removed theirs.
    pub async fn remove(&self, name: &str) -> bool {
        let outcomes = join_all(self.nodes.iter().enumerate().map(|(i, node)| async move {
            let shard = shard_name(name, i + 1);
            match Client::new(node.addr()).remove(&shard).await {
                Ok(true) => true,
                Ok(false) => {
                    tracing::info!("{} had no shard {}", node.addr(), shard);
                    false
                }
                Err(e) => {
                    tracing::warn!("{}", shard_error(&shard, node, e));
                    false
                }
            }
        }))
        .await;

        outcomes.into_iter().all(|removed| removed)
    }

    fn named_spool(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SPOOL_PREFIX);
        let spool = match &self.spool_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(spool)
    }

    fn anonymous_spool(&self) -> Result<File> {
        let file = match &self.spool_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(File::from_std(file))
    }
}

fn shard_error(shard: &str, node: &StorageNodeEndpoint, reason: impl ToString) -> Error {
    Error::ShardFailed {
        shard: shard.to_string(),
        addr: node.addr(),
        reason: reason.to_string(),
    }
}

struct ShardPart {
    file: File,
    len: u64,
}

/// A downloaded file, held as one unlinked temp file per shard until it is
/// written out. Dropping it discards the data.
pub struct Reconstruction {
    parts: Vec<ShardPart>,
}

impl Reconstruction {
    /// Total size of the reconstructed file
    pub fn len(&self) -> u64 {
        self.parts.iter().map(|p| p.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the shards to `w` in shard order.
    pub async fn write_to<W>(mut self, w: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        for part in &mut self.parts {
            part.file.seek(SeekFrom::Start(0)).await?;
            written += copy_exact(&mut part.file, w, part.len).await?;
        }
        Ok(written)
    }
}
