//! Shard placement
//!
//! A file of `size` bytes is cut into exactly `K` shards, one per storage
//! node, in node order. Shards `1..K-1` get `size / K` bytes and shard `K`
//! additionally takes the remainder `size % K`. Shard `i` (1-based) of file
//! `F` is stored as `F.part<i>` on node `i - 1`.
//!
//! The remainder always goes to the last shard; existing deployments depend
//! on this exact split.

use crate::common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static SHARD_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.part[0-9]+$").expect("shard suffix pattern"));

/// Name of shard `index` (1-based) of `name`.
pub fn shard_name(name: &str, index: usize) -> String {
    format!("{}.part{}", name, index)
}

/// Recover the logical file name from a shard name. Names without a shard
/// suffix are returned unchanged.
pub fn logical_name(shard: &str) -> &str {
    match SHARD_SUFFIX.find(shard) {
        Some(m) => &shard[..m.start()],
        None => shard,
    }
}

/// One shard's slice of the original file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpan {
    /// 1-based shard number, also the node position + 1
    pub index: usize,
    /// Byte offset in the original file
    pub offset: u64,
    pub len: u64,
}

/// How one file is cut across the storage nodes
#[derive(Debug, Clone)]
pub struct ShardPlan {
    name: String,
    spans: Vec<ShardSpan>,
}

impl ShardPlan {
    pub fn new(name: &str, size: u64, shard_count: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::NoStorageNodes);
        }

        let k = shard_count as u64;
        let base = size / k;
        let remainder = size % k;

        let spans = (1..=shard_count)
            .map(|index| {
                let len = if index == shard_count {
                    base + remainder
                } else {
                    base
                };
                ShardSpan {
                    index,
                    offset: base * (index as u64 - 1),
                    len,
                }
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            spans,
        })
    }

    pub fn spans(&self) -> &[ShardSpan] {
        &self.spans
    }

    pub fn shard_name(&self, span: &ShardSpan) -> String {
        shard_name(&self.name, span.index)
    }
}
