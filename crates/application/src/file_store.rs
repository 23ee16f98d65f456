use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("upload failed: {0}")]
    Upload(String),
}

impl FileStoreError {
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }
}

/// 存储成功后的文件位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// 客户端可访问的 URL。
    pub url: String,
    /// 存储提供方内部标识。
    pub provider_id: String,
}

/// 文件对象存储。
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, original_name: &str, bytes: Vec<u8>)
        -> Result<StoredUpload, FileStoreError>;
}
