//! In-process cluster for integration tests

#![allow(dead_code)]

use shardfs::common::{CoordinatorConfig, NodeConfig, StorageNodeEndpoint};
use shardfs::{Client, Coordinator, Result, StorageNode};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct Node {
    pub dir: PathBuf,
    pub endpoint: StorageNodeEndpoint,
    task: JoinHandle<Result<()>>,
}

impl Node {
    pub fn client(&self) -> Client {
        Client::new(self.endpoint.addr())
    }

    /// Path of shard `index` of `name` in this node's directory.
    pub fn shard_path(&self, name: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{}.part{}", name, index))
    }
}

pub struct Cluster {
    _root: TempDir,
    pub nodes: Vec<Node>,
    pub client: Client,
}

impl Cluster {
    /// Start `k` storage nodes and a coordinator in front of them.
    pub async fn start(k: usize) -> Self {
        let root = TempDir::new().unwrap();
        let mut nodes = Vec::new();
        for i in 1..=k {
            nodes.push(start_node(&root.path().join(format!("server_{}", i))).await);
        }
        let endpoints = nodes.iter().map(|n| n.endpoint.clone()).collect();
        let client = start_coordinator(endpoints).await;

        Self {
            _root: root,
            nodes,
            client,
        }
    }

    /// Stop node `i` (0-based) so that connections to it are refused.
    pub async fn kill(&mut self, i: usize) {
        let node = &mut self.nodes[i];
        node.task.abort();
        let _ = (&mut node.task).await;
    }

    pub fn endpoints(&self) -> Vec<StorageNodeEndpoint> {
        self.nodes.iter().map(|n| n.endpoint.clone()).collect()
    }
}

pub async fn start_node(dir: &Path) -> Node {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let bind_addr = listener.local_addr().unwrap();
    let node = StorageNode::new(NodeConfig {
        bind_addr,
        data_dir: dir.to_path_buf(),
    });
    let task = tokio::spawn(node.run(listener));

    Node {
        dir: dir.to_path_buf(),
        endpoint: StorageNodeEndpoint::new("127.0.0.1", bind_addr.port(), dir),
        task,
    }
}

pub async fn start_coordinator(endpoints: Vec<StorageNodeEndpoint>) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = CoordinatorConfig::new(addr, endpoints).unwrap();
    tokio::spawn(Coordinator::new(config).unwrap().run(listener));
    Client::new(addr.to_string())
}

/// A port nothing listens on.
pub fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Deterministic non-repeating-ish test payload
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ ((i >> 8) as u8))
        .collect()
}
