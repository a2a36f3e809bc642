//! Storage node implementation
//!
//! A storage node owns one directory and serves shard-level requests on it.
//! It knows nothing about sharding: shard names are opaque file names.

pub mod server;
pub mod store;

pub use server::StorageNode;
pub use store::ShardStore;
