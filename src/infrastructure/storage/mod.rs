use async_trait::async_trait;
use derive_more::Display;

pub mod local_disk;

pub use local_disk::LocalDiskStorage;

#[derive(Debug, Display)]
pub enum StorageError {
    #[display("not found: {_0}")]
    NotFound(String),

    #[display("rejected path: {_0}")]
    InvalidPath(String),

    #[display("io error: {_0}")]
    Io(std::io::Error),
}

impl std::error::Error for StorageError {}

/// Byte storage addressed by paths relative to the uploads root.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, rel_path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn read(&self, rel_path: &str) -> Result<Vec<u8>, StorageError>;
    /// Removing a path that does not exist succeeds.
    async fn delete(&self, rel_path: &str) -> Result<(), StorageError>;
    async fn check(&self) -> Result<(), StorageError>;
}
