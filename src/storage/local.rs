use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncRead};

use crate::{
    errors::{AppError, Result},
    storage::ObjectStorage,
};

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;

        Ok(Self { base_path })
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.full_path(key);
        self.ensure_parent(&path).await?;

        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write object: {}", e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.full_path(key);

        fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read object: {}", e)))
    }

    async fn reader(&self, key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let path = self.full_path(key);

        let file = fs::File::open(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to open object: {}", e)))?;

        Ok(Box::new(file))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.full_path(key);

        fs::remove_file(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete object: {}", e)))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.full_path(key).exists())
    }

    async fn size(&self, key: &str) -> Result<u64> {
        let path = self.full_path(key);

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat object: {}", e)))?;

        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_operations() {
        let temp_dir = tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        let data = b"RIFF fake wav bytes";
        let key = "owner/uploads/2026/01/01/sample.wav";

        storage.put(key, data).await.unwrap();
        assert!(storage.exists(key).await.unwrap());
        assert_eq!(storage.get(key).await.unwrap(), data);
        assert_eq!(storage.size(key).await.unwrap(), data.len() as u64);

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object_is_a_storage_error() {
        let temp_dir = tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        assert!(storage.get("nope/missing.bin").await.is_err());
        assert!(storage.reader("nope/missing.bin").await.is_err());
    }
}
