use std::path::PathBuf;

use application::{FileStore, FileStoreError, StoredUpload};
use async_trait::async_trait;
use uuid::Uuid;

/// 本地磁盘文件存储。文件名加 UUID 前缀避免冲突，
/// 原始文件名只保留安全字符。
#[derive(Clone)]
pub struct DiskFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn sanitize(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            "file".to_owned()
        } else {
            cleaned
        }
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn store(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredUpload, FileStoreError> {
        let file_name = format!("{}-{}", Uuid::new_v4(), Self::sanitize(original_name));
        let path = self.root.join(&file_name);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| FileStoreError::upload(err.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| FileStoreError::upload(err.to_string()))?;

        tracing::debug!(file = %file_name, "attachment written to disk");
        Ok(StoredUpload {
            url: format!("{}/{}", self.public_base_url, file_name),
            provider_id: file_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(DiskFileStore::sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(DiskFileStore::sanitize("photo de chat.png"), "photo_de_chat.png");
        assert_eq!(DiskFileStore::sanitize(""), "file");
    }

    #[tokio::test]
    async fn store_writes_the_bytes_under_a_unique_name() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let store = DiskFileStore::new(&dir, "/uploads/");

        let upload = store
            .store("note.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert!(upload.url.starts_with("/uploads/"));
        assert!(upload.url.ends_with("note.txt"));

        let written = tokio::fs::read(dir.join(&upload.provider_id)).await.unwrap();
        assert_eq!(written, b"hello");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
