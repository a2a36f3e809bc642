//! Common utilities and types shared across shardfs

pub mod config;
pub mod error;
pub mod utils;

pub use config::{Config, CoordinatorConfig, NodeConfig, StorageNodeEndpoint};
pub use error::{Error, Result};
pub use utils::{format_bytes, validate_name};
