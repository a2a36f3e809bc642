//! # shardfs
//!
//! A sharded file store:
//! - A coordinator splits every uploaded file into one shard per storage node
//! - Storage nodes keep shards as plain files in a local directory
//! - Downloads are rebuilt by concatenating the shards in node order
//! - One tiny length-prefixed binary protocol on every link
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────┐
//!   client ───▶│ Coordinator  │  split / reconstruct / merge listings
//!              └──────┬───────┘
//!                     │ same protocol, shard names
//!   ┌─────────────────┼──────────────────┐
//!   │                 │                  │
//! ┌─▼──────────┐  ┌───▼────────┐   ┌─────▼──────┐
//! │ Node 1     │  │ Node 2     │   │ Node 3     │
//! │ f.part1    │  │ f.part2    │   │ f.part3    │
//! └────────────┘  └────────────┘   └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start storage nodes
//! ```bash
//! shardfs-node serve --config configuration.txt --number 1
//! shardfs-node serve --bind 0.0.0.0:5002 --data ./server_2
//! ```
//!
//! ### Start the coordinator
//! ```bash
//! shardfs-coord serve --config configuration.txt
//! ```
//!
//! ### Use the CLI
//! ```bash
//! shardfs upload ./report.txt
//! shardfs list
//! shardfs download report.txt --output ./copy.txt
//! shardfs remove report.txt
//! ```

pub mod common;
pub mod coordinator;
pub mod node;
pub mod protocol;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use node::StorageNode;
pub use protocol::Client;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
