//! Storage node failure handling

mod common;

use common::{start_coordinator, unused_port, Cluster};
use shardfs::common::{CoordinatorConfig, StorageNodeEndpoint};
use shardfs::{Coordinator, Error};
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_remove_with_unreachable_node() {
    let mut cluster = Cluster::start(3).await;
    assert!(cluster.client.upload_bytes("r", b"abcdefg").await.unwrap());

    cluster.kill(2).await;

    // Overall failure, but every reachable node still dropped its shard
    assert!(!cluster.client.remove("r").await.unwrap());
    assert!(!cluster.nodes[0].shard_path("r", 1).exists());
    assert!(!cluster.nodes[1].shard_path("r", 2).exists());
    assert!(cluster.nodes[2].shard_path("r", 3).exists());
}

#[tokio::test]
async fn test_remove_with_never_started_node() {
    let cluster = Cluster::start(2).await;
    assert!(cluster.client.upload_bytes("r", b"abcd").await.unwrap());

    let mut endpoints = cluster.endpoints();
    endpoints.push(StorageNodeEndpoint::new("127.0.0.1", unused_port(), "nowhere"));
    let client = start_coordinator(endpoints).await;

    assert!(!client.remove("r").await.unwrap());
    assert!(!cluster.nodes[0].shard_path("r", 1).exists());
    assert!(!cluster.nodes[1].shard_path("r", 2).exists());
}

#[tokio::test]
async fn test_list_skips_unreachable_node() {
    let mut cluster = Cluster::start(3).await;
    assert!(cluster.client.upload_bytes("a", b"first").await.unwrap());
    assert!(cluster.client.upload_bytes("b", b"second").await.unwrap());

    cluster.kill(1).await;

    let names: HashSet<String> = cluster.client.list().await.unwrap().into_iter().collect();
    assert_eq!(names, HashSet::from(["a".to_string(), "b".to_string()]));
}

#[tokio::test]
async fn test_list_with_all_nodes_down() {
    let mut cluster = Cluster::start(2).await;
    assert!(cluster.client.upload_bytes("a", b"first").await.unwrap());

    cluster.kill(0).await;
    cluster.kill(1).await;

    assert!(cluster.client.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_with_unreachable_node() {
    let mut cluster = Cluster::start(3).await;
    assert!(cluster.client.upload_bytes("d", b"0123456789").await.unwrap());

    cluster.kill(1).await;

    assert_eq!(cluster.client.download("d").await.unwrap(), None);
}

#[tokio::test]
async fn test_download_with_missing_shard() {
    let cluster = Cluster::start(3).await;
    assert!(cluster.client.upload_bytes("d", b"0123456789").await.unwrap());

    std::fs::remove_file(cluster.nodes[1].shard_path("d", 2)).unwrap();

    assert_eq!(cluster.client.download("d").await.unwrap(), None);
    // The other shards are left alone
    assert!(cluster.nodes[0].shard_path("d", 1).exists());
    assert!(cluster.nodes[2].shard_path("d", 3).exists());
}

#[tokio::test]
async fn test_download_missing_shard_does_not_wait_for_stalled_node() {
    let cluster = Cluster::start(1).await;

    // Accepts connections and never answers
    let stalled = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stalled_port = stalled.local_addr().unwrap().port();
    let held = tokio::spawn(async move {
        let mut sockets = Vec::new();
        while let Ok((socket, _)) = stalled.accept().await {
            sockets.push(socket);
        }
    });

    let mut endpoints = cluster.endpoints();
    endpoints.push(StorageNodeEndpoint::new("127.0.0.1", stalled_port, "stalled"));
    let client = start_coordinator(endpoints).await;

    // x.part1 is missing on the live node, so the answer is known without node 2
    let downloaded = tokio::time::timeout(Duration::from_secs(5), client.download("x"))
        .await
        .expect("download waited on the stalled node");
    assert_eq!(downloaded.unwrap(), None);

    held.abort();
}

#[tokio::test]
async fn test_upload_with_unreachable_node_keeps_partial_shards() {
    let mut cluster = Cluster::start(3).await;
    cluster.kill(1).await;

    assert!(!cluster.client.upload_bytes("u", b"0123456789").await.unwrap());

    // No rollback of shards that made it
    assert_eq!(
        std::fs::read(cluster.nodes[0].shard_path("u", 1)).unwrap(),
        b"012"
    );
    assert_eq!(
        std::fs::read(cluster.nodes[2].shard_path("u", 3)).unwrap(),
        b"6789"
    );
    assert!(!cluster.nodes[1].shard_path("u", 2).exists());
}

#[tokio::test]
async fn test_coordinator_requires_storage_nodes() {
    let addr = "127.0.0.1:0".parse().unwrap();
    assert!(matches!(
        CoordinatorConfig::new(addr, Vec::new()),
        Err(Error::NoStorageNodes)
    ));

    let mut config =
        CoordinatorConfig::new(addr, vec![StorageNodeEndpoint::new("127.0.0.1", 1, "n1")])
            .unwrap();
    config.storage_nodes = Vec::new().into();
    assert!(matches!(
        Coordinator::new(config),
        Err(Error::NoStorageNodes)
    ));
}
