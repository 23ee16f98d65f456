use std::sync::Arc;

use domain::{
    DomainError, FileId, FileRecord, GroupId, Message, MessageContent, MessageId, User, UserId,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::dto::MessageDto;
use crate::error::ApplicationError;
use crate::file_store::FileStore;
use crate::repository::{
    FileRepository, GroupMembershipRepository, GroupRepository, MessageRepository, UserRepository,
};

/// 随消息一起提交的附件。
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub attachment: Option<AttachmentUpload>,
}

pub struct MessageServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub membership_repository: Arc<dyn GroupMembershipRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub file_repository: Arc<dyn FileRepository>,
    pub file_store: Arc<dyn FileStore>,
    pub clock: Arc<dyn Clock>,
}

/// 私聊和群聊消息：发送（可带附件）与历史查询。
/// 实时投递由分发引擎负责，这里只落库。
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    async fn load_user(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    async fn require_member(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<(), ApplicationError> {
        if self
            .deps
            .group_repository
            .find_by_id(group)
            .await?
            .is_none()
        {
            return Err(DomainError::GroupNotFound.into());
        }
        if self
            .deps
            .membership_repository
            .find(group, user)
            .await?
            .is_none()
        {
            return Err(DomainError::NotGroupMember.into());
        }
        Ok(())
    }

    /// 上传附件并登记文件记录，返回文件引用。
    async fn store_attachment(
        &self,
        uploader: UserId,
        attachment: AttachmentUpload,
    ) -> Result<FileRecord, ApplicationError> {
        let upload = self
            .deps
            .file_store
            .store(&attachment.file_name, attachment.bytes)
            .await?;
        let record = FileRecord::new(
            FileId::from(Uuid::new_v4()),
            uploader,
            upload.url,
            upload.provider_id,
            self.deps.clock.now(),
        );
        let stored = self.deps.file_repository.create(record).await?;
        Ok(stored)
    }

    /// 私聊消息只能发给好友。
    pub async fn send_private(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        request: SendMessageRequest,
    ) -> Result<MessageDto, ApplicationError> {
        let sender = self.load_user(sender_id).await?;
        self.load_user(receiver_id).await?;
        if !sender.is_friend_with(receiver_id) {
            return Err(DomainError::NotFriends.into());
        }

        let content = request.content.map(MessageContent::new).transpose()?;
        let file = match request.attachment {
            Some(attachment) => Some(self.store_attachment(sender_id, attachment).await?),
            None => None,
        };

        let message = Message::private(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            receiver_id,
            content,
            file.as_ref().map(|f| f.id),
            self.deps.clock.now(),
        )?;
        let stored = self.deps.message_repository.create(message).await?;
        tracing::debug!(message_id = %stored.id, "private message stored");
        Ok(MessageDto::hydrate(&stored, file.as_ref()))
    }

    /// 双向的私聊历史，按创建时间升序。只有好友之间可以查看。
    pub async fn private_history(
        &self,
        user_id: UserId,
        contact_id: UserId,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        let user = self.load_user(user_id).await?;
        if !user.is_friend_with(contact_id) {
            return Err(DomainError::NotFriends.into());
        }
        let messages = self
            .deps
            .message_repository
            .list_private_between(user_id, contact_id)
            .await?;
        self.hydrate_all(&messages).await
    }

    /// 群聊消息只能由成员发送。
    pub async fn send_group(
        &self,
        sender_id: UserId,
        group_id: GroupId,
        request: SendMessageRequest,
    ) -> Result<MessageDto, ApplicationError> {
        self.load_user(sender_id).await?;
        self.require_member(group_id, sender_id).await?;

        let content = request.content.map(MessageContent::new).transpose()?;
        let file = match request.attachment {
            Some(attachment) => Some(self.store_attachment(sender_id, attachment).await?),
            None => None,
        };

        let message = Message::group(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            group_id,
            content,
            file.as_ref().map(|f| f.id),
            self.deps.clock.now(),
        )?;
        let stored = self.deps.message_repository.create(message).await?;
        tracing::debug!(message_id = %stored.id, group_id = %group_id, "group message stored");
        Ok(MessageDto::hydrate(&stored, file.as_ref()))
    }

    /// 群聊历史只对成员可见，按创建时间升序。
    pub async fn group_history(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        self.require_member(group_id, user_id).await?;
        let messages = self.deps.message_repository.list_for_group(group_id).await?;
        self.hydrate_all(&messages).await
    }

    async fn hydrate_all(&self, messages: &[Message]) -> Result<Vec<MessageDto>, ApplicationError> {
        let file_ids: Vec<FileId> = messages.iter().filter_map(|m| m.file_id).collect();
        let files = self.deps.file_repository.find_many(&file_ids).await?;
        Ok(messages
            .iter()
            .map(|message| {
                let file = message
                    .file_id
                    .and_then(|id| files.iter().find(|f| f.id == id));
                MessageDto::hydrate(message, file)
            })
            .collect())
    }
}
