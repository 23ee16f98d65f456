use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{FileId, GroupId, MessageId, Timestamp, UserId};

/// 消息正文内容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "content",
                "cannot be empty",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 一条消息，创建后不可变。
///
/// 不变式：receiver_id 和 group_id 恰好有一个非空（私聊 XOR 群聊），
/// content 和 file_id 至少有一个非空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub group_id: Option<GroupId>,
    pub content: Option<MessageContent>,
    pub file_id: Option<FileId>,
    pub created_at: Timestamp,
}

impl Message {
    pub fn private(
        id: MessageId,
        sender_id: UserId,
        receiver_id: UserId,
        content: Option<MessageContent>,
        file_id: Option<FileId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if content.is_none() && file_id.is_none() {
            return Err(DomainError::invalid_argument(
                "content",
                "message needs text or an attachment",
            ));
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id: Some(receiver_id),
            group_id: None,
            content,
            file_id,
            created_at: now,
        })
    }

    pub fn group(
        id: MessageId,
        sender_id: UserId,
        group_id: GroupId,
        content: Option<MessageContent>,
        file_id: Option<FileId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if content.is_none() && file_id.is_none() {
            return Err(DomainError::invalid_argument(
                "content",
                "message needs text or an attachment",
            ));
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id: None,
            group_id: Some(group_id),
            content,
            file_id,
            created_at: now,
        })
    }

    /// 从持久层恢复时校验会话上下文不变式。
    pub fn restore(
        id: MessageId,
        sender_id: UserId,
        receiver_id: Option<UserId>,
        group_id: Option<GroupId>,
        content: Option<MessageContent>,
        file_id: Option<FileId>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if receiver_id.is_some() == group_id.is_some() {
            return Err(DomainError::InvalidMessageTarget);
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            group_id,
            content,
            file_id,
            created_at,
        })
    }

    pub fn is_private(&self) -> bool {
        self.receiver_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn message_requires_text_or_attachment() {
        let result = Message::private(
            MessageId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            None,
            None,
            now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn restore_rejects_ambiguous_conversation_context() {
        let both = Message::restore(
            MessageId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            Some(UserId::from(Uuid::new_v4())),
            Some(GroupId::from(Uuid::new_v4())),
            Some(MessageContent::new("hi").unwrap()),
            None,
            now(),
        );
        assert_eq!(both.unwrap_err(), DomainError::InvalidMessageTarget);

        let neither = Message::restore(
            MessageId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            None,
            None,
            Some(MessageContent::new("hi").unwrap()),
            None,
            now(),
        );
        assert_eq!(neither.unwrap_err(), DomainError::InvalidMessageTarget);
    }
}
