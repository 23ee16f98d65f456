use serde::{Deserialize, Serialize};

use crate::value_objects::{FileId, Timestamp, UserId};

/// 随消息创建的文件附件记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub uploader_id: UserId,
    pub url: String,
    /// 存储提供方内部标识，用于后续删除。
    pub provider_id: String,
    pub created_at: Timestamp,
}

impl FileRecord {
    pub fn new(
        id: FileId,
        uploader_id: UserId,
        url: impl Into<String>,
        provider_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            uploader_id,
            url: url.into(),
            provider_id: provider_id.into(),
            created_at: now,
        }
    }
}
