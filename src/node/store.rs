//! Shard storage on the local filesystem
//!
//! Layout: one plain file per shard directly under the node's directory,
//! named `<logical name>.part<N>`. There is no index or manifest; a shard
//! exists if and only if its file does.
//!
//! Operations on the same name are not synchronized. An UPLOAD racing a
//! DOWNLOAD of the same shard can serve a partially written file, and a crash
//! mid-write leaves a truncated shard (no temp file + rename).

use crate::common::{validate_name, Result};
use crate::protocol::frame::copy_exact;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};

pub struct ShardStore {
    root: PathBuf,
}

impl ShardStore {
    /// Open the store, creating the directory if it does not exist yet.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if fs::metadata(&root).await.is_err() {
            fs::create_dir_all(&root).await?;
            tracing::info!("Created storage directory {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Write exactly `size` bytes from `payload` to `name`, replacing any
    /// existing shard.
    pub async fn write<R>(&self, name: &str, size: u64, payload: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut writer = BufWriter::new(File::create(&path).await?);
        copy_exact(payload, &mut writer, size).await?;
        writer.flush().await?;
        Ok(size)
    }

    /// Open a shard for reading. `None` if it does not exist.
    pub async fn open_shard(&self, name: &str) -> Result<Option<(File, u64)>> {
        let path = self.resolve(name)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Ok(None);
        }
        Ok(Some((file, meta.len())))
    }

    /// Names of the regular files directly in the directory, in enumeration
    /// order.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("Skipping non UTF-8 file name {:?}", raw),
            }
        }
        Ok(names)
    }

    /// Delete a shard. `false` if it did not exist or is not a regular file.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            // Lost a race with another REMOVE
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn read_all(store: &ShardStore, name: &str) -> Option<Vec<u8>> {
        let (mut file, len) = store.open_shard(name).await.unwrap()?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await.unwrap();
        assert_eq!(data.len() as u64, len);
        Some(data)
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("server_1");

        let store = ShardStore::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        let mut payload: &[u8] = b"hello world";
        store.write("a.part1", 5, &mut payload).await.unwrap();
        // Only the declared size is consumed
        assert_eq!(payload, b" world");

        assert_eq!(read_all(&store, "a.part1").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        store.write("a.part1", 6, &mut &b"longer"[..]).await.unwrap();
        store.write("a.part1", 2, &mut &b"ab"[..]).await.unwrap();

        assert_eq!(read_all(&store, "a.part1").await.unwrap(), b"ab");
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        store
            .write("docs/2024/q1.pdf.part2", 3, &mut &b"pdf"[..])
            .await
            .unwrap();
        assert!(dir.path().join("docs/2024/q1.pdf.part2").is_file());
    }

    #[tokio::test]
    async fn test_write_short_payload_fails() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        let err = store
            .write("a.part1", 10, &mut &b"abc"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_shard() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        assert!(store.open_shard("nope.part1").await.unwrap().is_none());
        assert!(!store.remove("nope.part1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        store.write("a.part1", 1, &mut &b"a"[..]).await.unwrap();
        store.write("b.part1", 1, &mut &b"b"[..]).await.unwrap();
        store.write("sub/c.part1", 1, &mut &b"c"[..]).await.unwrap();

        let mut names = store.list().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a.part1", "b.part1"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();

        store.write("a.part1", 1, &mut &b"a"[..]).await.unwrap();
        assert!(store.remove("a.part1").await.unwrap());
        assert!(!store.remove("a.part1").await.unwrap());
        assert!(store.open_shard("a.part1").await.unwrap().is_none());

        store.write("sub/x.part1", 1, &mut &b"x"[..]).await.unwrap();
        assert!(!store.remove("sub").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let store = ShardStore::open(dir.path().join("node")).await.unwrap();

        assert!(matches!(
            store.write("../outside", 1, &mut &b"x"[..]).await,
            Err(Error::InvalidName(_))
        ));
        assert!(!dir.path().join("outside").exists());
        assert!(store.open_shard("/etc/passwd").await.is_err());
    }
}
