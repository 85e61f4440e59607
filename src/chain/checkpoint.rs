//! Durable cursor for the indexer
//!
//! The stored value is the next block the indexer will process: every block
//! strictly below it has been fully handled.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::fs;
use tracing::info;

use crate::errors::{KeeperError, KeeperResult};

#[async_trait]
pub trait Checkpoint: Send + Sync {
    async fn exists(&self) -> KeeperResult<bool>;
    async fn create(&self) -> KeeperResult<()>;
    async fn read(&self) -> KeeperResult<u64>;
    async fn update(&self, value: u64) -> KeeperResult<()>;
}

/// Plain-text block number in a single file.
pub struct FileCheckpoint {
    path: PathBuf,
    start_block: u64,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>, start_block: u64) -> Self {
        Self {
            path: path.into(),
            start_block,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, value: u64) -> KeeperResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| checkpoint_error("create checkpoint directory", e))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, value.to_string())
            .await
            .map_err(|e| checkpoint_error("write checkpoint", e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| checkpoint_error("replace checkpoint", e))
    }
}

#[async_trait]
impl Checkpoint for FileCheckpoint {
    async fn exists(&self) -> KeeperResult<bool> {
        fs::try_exists(&self.path)
            .await
            .map_err(|e| checkpoint_error("stat checkpoint", e))
    }

    async fn create(&self) -> KeeperResult<()> {
        self.write(self.start_block).await?;
        info!(
            path = %self.path.display(),
            block = self.start_block,
            "Created block checkpoint"
        );
        Ok(())
    }

    async fn read(&self) -> KeeperResult<u64> {
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|e| checkpoint_error("read checkpoint", e))?;

        raw.lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(|line| line.parse().ok())
            .ok_or_else(|| {
                checkpoint_error(
                    "parse checkpoint",
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("no block number in {:?}", raw),
                    ),
                )
            })
    }

    async fn update(&self, value: u64) -> KeeperResult<()> {
        self.write(value).await
    }
}

/// Process-local checkpoint for dry runs and tests.
pub struct MemoryCheckpoint {
    created: AtomicBool,
    value: AtomicU64,
    start_block: u64,
}

impl MemoryCheckpoint {
    pub fn new(start_block: u64) -> Self {
        Self {
            created: AtomicBool::new(false),
            value: AtomicU64::new(start_block),
            start_block,
        }
    }

    pub fn at(value: u64) -> Self {
        let checkpoint = Self::new(value);
        checkpoint.created.store(true, Ordering::SeqCst);
        checkpoint
    }
}

#[async_trait]
impl Checkpoint for MemoryCheckpoint {
    async fn exists(&self) -> KeeperResult<bool> {
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn create(&self) -> KeeperResult<()> {
        self.value.store(self.start_block, Ordering::SeqCst);
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self) -> KeeperResult<u64> {
        if !self.created.load(Ordering::SeqCst) {
            return Err(checkpoint_error(
                "read checkpoint",
                std::io::Error::new(std::io::ErrorKind::NotFound, "checkpoint not created"),
            ));
        }
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn update(&self, value: u64) -> KeeperResult<()> {
        self.value.store(value, Ordering::SeqCst);
        Ok(())
    }
}

fn checkpoint_error(context: &str, source: std::io::Error) -> KeeperError {
    KeeperError::Checkpoint {
        context: context.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_checkpoint_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = FileCheckpoint::new(dir.path().join("ptr/block_ptr"), 247_010_149);

        assert!(!checkpoint.exists().await.unwrap());
        checkpoint.create().await.unwrap();
        assert!(checkpoint.exists().await.unwrap());
        assert_eq!(checkpoint.read().await.unwrap(), 247_010_149);

        checkpoint.update(247_010_200).await.unwrap();
        assert_eq!(checkpoint.read().await.unwrap(), 247_010_200);

        // a shorter number must not leave trailing digits behind
        checkpoint.update(7).await.unwrap();
        assert_eq!(checkpoint.read().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn unreadable_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_ptr");
        std::fs::write(&path, "not a number").unwrap();

        let err = FileCheckpoint::new(&path, 0).read().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn memory_checkpoint_requires_create() {
        let checkpoint = MemoryCheckpoint::new(10);
        assert!(tokio_test::block_on(checkpoint.read()).is_err());
        tokio_test::block_on(checkpoint.create()).unwrap();
        assert_eq!(tokio_test::block_on(checkpoint.read()).unwrap(), 10);
    }
}
