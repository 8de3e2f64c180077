use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use super::{FileStorage, StorageError};

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDiskStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel_path: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(rel_path);
        let is_plain = !rel_path.is_empty()
            && path.components().all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidPath(rel_path.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn put(&self, rel_path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(rel_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
        }
        fs::write(&path, bytes).await.map_err(StorageError::Io)?;

        tracing::debug!(path = %rel_path, size = bytes.len(), "stored file");
        Ok(())
    }

    async fn read(&self, rel_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(rel_path)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(rel_path.to_string()),
            _ => StorageError::Io(e),
        })
    }

    async fn delete(&self, rel_path: &str) -> Result<(), StorageError> {
        let path = self.resolve(rel_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn check(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await.map_err(StorageError::Io)?;
        let metadata = fs::metadata(&self.root).await.map_err(StorageError::Io)?;
        if metadata.permissions().readonly() {
            return Err(StorageError::InvalidPath(self.root.display().to_string()));
        }
        Ok(())
    }
}
