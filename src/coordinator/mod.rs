//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Splitting uploads into one shard per storage node
//! - Reconstructing downloads from the shards in node order
//! - Merging node listings into logical file names
//! - Removing a file's shards from every node

pub mod distributor;
pub mod placement;
pub mod server;

pub use distributor::Distributor;
pub use placement::{logical_name, shard_name, ShardPlan};
pub use server::Coordinator;
