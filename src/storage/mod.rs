use async_trait::async_trait;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::errors::Result;

pub mod local;

/// Backing store for raw asset bytes. Rows in the assets table reference
/// objects here by key; deleting an asset removes both.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Streaming handle for large downloads.
    async fn reader(&self, key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn size(&self, key: &str) -> Result<u64>;
}

/// Object keys group by owner, then date.
pub fn object_key(owner_id: Uuid, prefix: &str, filename: &str) -> String {
    let date = chrono::Utc::now().format("%Y/%m/%d");
    format!("{}/{}/{}/{}", owner_id, prefix, date, filename)
}
