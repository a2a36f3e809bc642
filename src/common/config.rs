//! Configuration for shardfs components
//!
//! A single [`Config`] describes the whole deployment: where the coordinator
//! listens and the ordered list of storage nodes. It is loaded once at startup
//! and turned into the immutable per-role values ([`CoordinatorConfig`],
//! [`NodeConfig`]) handed to the servers.
//!
//! Two file formats are accepted:
//!
//! ```toml
//! bind_addr = "0.0.0.0:5000"
//!
//! [[storage_nodes]]
//! host = "localhost"
//! port = 5001
//! directory = "server_1/"
//! ```
//!
//! and the legacy numbered key/value layout (`.txt` / `.properties`):
//!
//! ```text
//! port=5000
//! slave.port1=5001
//! slave.directory.1=server_1/
//! client.download.directory=client_downloads/
//! ```

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "SHARDFS_CONFIG";

pub const DEFAULT_COORDINATOR_PORT: u16 = 5000;

/// One storage node as seen by the coordinator.
///
/// The position of an endpoint in the configured list fixes which shard it
/// holds: endpoint `i` (0-based) stores `<name>.part<i+1>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodeEndpoint {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    pub directory: PathBuf,
}

impl StorageNodeEndpoint {
    pub fn new(host: impl Into<String>, port: u16, directory: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            directory: directory.into(),
        }
    }

    /// `host:port` string suitable for `TcpStream::connect`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Ordered storage node list
    #[serde(default)]
    pub storage_nodes: Vec<StorageNodeEndpoint>,

    /// Directory for coordinator spool files (system temp dir if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spool_dir: Option<PathBuf>,

    /// Where the CLI writes downloaded files
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_COORDINATOR_PORT))
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("client_downloads")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage_nodes: Vec::new(),
            spool_dir: None,
            download_dir: default_download_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `$SHARDFS_CONFIG` when no path
    /// is given. Without either, only `SHARDFS_*` environment variables and
    /// defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) if is_legacy_format(&path) => {
                tracing::debug!("Loading legacy config from {}", path.display());
                let text = std::fs::read_to_string(&path)?;
                Self::from_properties(&text)
            }
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::layered(Some(&path))
            }
            None => Self::layered(None),
        }
    }

    /// File (if any) overlaid with `SHARDFS_` environment variables,
    /// e.g. `SHARDFS_BIND_ADDR=127.0.0.1:6000`.
    fn layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("SHARDFS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse the legacy numbered key/value format.
    ///
    /// Storage nodes are read from `slave.port<N>` / `slave.directory.<N>`
    /// starting at `N = 1` until the first missing pair.
    pub fn from_properties(text: &str) -> Result<Self> {
        let props = parse_properties(text);
        let mut config = Config::default();

        if let Some(port) = props.get("port") {
            config.bind_addr = SocketAddr::from(([0, 0, 0, 0], parse_port("port", port)?));
        }
        if let Some(dir) = props.get("client.download.directory") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Some(dir) = props.get("spool.directory") {
            config.spool_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = props.get("log.level") {
            config.log_level = level.to_string();
        }

        for index in 1.. {
            let port_key = format!("slave.port{}", index);
            let dir_key = format!("slave.directory.{}", index);
            let (Some(port), Some(dir)) = (props.get(&port_key), props.get(&dir_key)) else {
                break;
            };
            let host = props
                .get(&format!("slave.host{}", index))
                .map(|h| h.to_string())
                .unwrap_or_else(default_host);
            config.storage_nodes.push(StorageNodeEndpoint::new(
                host,
                parse_port(&port_key, port)?,
                dir,
            ));
        }

        Ok(config)
    }

    /// Build the coordinator configuration. Fails when no storage nodes are
    /// configured.
    pub fn coordinator(&self) -> Result<CoordinatorConfig> {
        let mut coord = CoordinatorConfig::new(self.bind_addr, self.storage_nodes.clone())?;
        coord.spool_dir = self.spool_dir.clone();
        Ok(coord)
    }

    /// Build the configuration of storage node `number` (1-based, matching
    /// the shard suffix it stores).
    pub fn storage_node(&self, number: usize) -> Result<NodeConfig> {
        let endpoint = number
            .checked_sub(1)
            .and_then(|i| self.storage_nodes.get(i))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "no storage node #{} (have {})",
                    number,
                    self.storage_nodes.len()
                ))
            })?;
        Ok(NodeConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], endpoint.port)),
            data_dir: endpoint.directory.clone(),
        })
    }
}

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Client-facing listen address
    pub bind_addr: SocketAddr,

    /// Storage nodes in shard order; never reordered after startup
    pub storage_nodes: Arc<[StorageNodeEndpoint]>,

    /// Directory for spool files
    pub spool_dir: Option<PathBuf>,
}

impl CoordinatorConfig {
    pub fn new(bind_addr: SocketAddr, storage_nodes: Vec<StorageNodeEndpoint>) -> Result<Self> {
        if storage_nodes.is_empty() {
            return Err(Error::NoStorageNodes);
        }
        Ok(Self {
            bind_addr,
            storage_nodes: storage_nodes.into(),
            spool_dir: None,
        })
    }

    /// Shard count `K`
    pub fn shard_count(&self) -> usize {
        self.storage_nodes.len()
    }
}

/// Storage node configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Listen address
    pub bind_addr: SocketAddr,

    /// Directory holding this node's shard files
    pub data_dir: PathBuf,
}

fn is_legacy_format(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("properties")
    )
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid port for {}: {:?}", key, value)))
}

/// Minimal `key=value` / `key: value` reader; `#` and `!` start comments.
/// Backslash escapes and `\` line continuations are not supported.
fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(|c: char| c == '=' || c == ':')?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}
