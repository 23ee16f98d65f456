//! 内存实现的存储适配器（用于测试和本地开发）。
//!
//! 所有仓储共享同一把锁，跨实体的"事务"天然原子。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    FileId, FileRecord, FriendRequest, FriendRequestStatus, Group, GroupId, GroupMembership,
    GroupRequest, GroupRequestStatus, Message, Pseudo, RepositoryError, RequestId, User, UserEmail,
    UserId, UserStatus,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::file_store::{FileStore, FileStoreError, StoredUpload};
use crate::repository::{
    FileRepository, FriendRequestRepository, GroupMembershipRepository, GroupRepository,
    GroupRequestRepository, MessageRepository, UserRepository,
};

#[derive(Default)]
struct MemoryInner {
    users: HashMap<UserId, User>,
    friend_requests: HashMap<RequestId, FriendRequest>,
    groups: HashMap<GroupId, Group>,
    memberships: HashMap<(GroupId, UserId), GroupMembership>,
    group_requests: HashMap<RequestId, GroupRequest>,
    messages: Vec<Message>,
    files: HashMap<FileId, FileRecord>,
}

/// 单进程内存存储，实现全部仓储端口。
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .users
            .values()
            .any(|u| u.email == user.email || u.pseudo == user.pseudo);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_pseudo(&self, pseudo: Pseudo) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.pseudo == pseudo).cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn get_friend_ids(&self, id: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .map(|u| u.friends.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.status = status;
        Ok(())
    }

    async fn search_by_pseudo(&self, query: &str) -> Result<Vec<User>, RepositoryError> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.pseudo.as_str().to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for user in inner.users.values_mut() {
            user.friends.retain(|f| *f != id);
        }
        inner
            .friend_requests
            .retain(|_, r| r.sender_id != id && r.receiver_id != id);
        inner.memberships.retain(|(_, user_id), _| *user_id != id);
        inner.group_requests.retain(|_, r| r.user_id != id);
        inner
            .messages
            .retain(|m| m.sender_id != id && m.receiver_id != Some(id));
        Ok(())
    }
}

#[async_trait]
impl FriendRequestRepository for MemoryStore {
    async fn create(&self, request: FriendRequest) -> Result<FriendRequest, RepositoryError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .friend_requests
            .values()
            .any(|r| r.sender_id == request.sender_id && r.receiver_id == request.receiver_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        inner.friend_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FriendRequest>, RepositoryError> {
        Ok(self.inner.read().await.friend_requests.get(&id).cloned())
    }

    async fn find_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .friend_requests
            .values()
            .find(|r| {
                (r.sender_id == a && r.receiver_id == b)
                    || (r.sender_id == b && r.receiver_id == a)
            })
            .cloned())
    }

    async fn list_pending_for(&self, user: UserId) -> Result<Vec<FriendRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .friend_requests
            .values()
            .filter(|r| {
                r.status == FriendRequestStatus::Pending
                    && (r.sender_id == user || r.receiver_id == user)
            })
            .cloned()
            .collect())
    }

    async fn mark_denied(&self, id: RequestId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .friend_requests
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = FriendRequestStatus::Denied;
        Ok(())
    }

    async fn accept(
        &self,
        id: RequestId,
        sender: UserId,
        receiver: UserId,
    ) -> Result<(), RepositoryError> {
        // 单锁之下三路更新天然原子
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&sender) || !inner.users.contains_key(&receiver) {
            return Err(RepositoryError::NotFound);
        }
        {
            let request = inner
                .friend_requests
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound)?;
            request.status = FriendRequestStatus::Accepted;
        }
        inner.users.get_mut(&sender).unwrap().add_friend(receiver);
        inner.users.get_mut(&receiver).unwrap().add_friend(sender);
        Ok(())
    }

    async fn unfriend(&self, a: UserId, b: UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner
            .friend_requests
            .retain(|_, r| {
                !((r.sender_id == a && r.receiver_id == b)
                    || (r.sender_id == b && r.receiver_id == a))
            });
        if let Some(user) = inner.users.get_mut(&a) {
            user.remove_friend(b);
        }
        if let Some(user) = inner.users.get_mut(&b) {
            user.remove_friend(a);
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_with_owner(
        &self,
        group: Group,
        owner: GroupMembership,
    ) -> Result<Group, RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.groups.insert(group.id, group.clone());
        inner
            .memberships
            .insert((owner.group_id, owner.user_id), owner);
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepositoryError> {
        let mut inner = self.inner.write().await;
        if !inner.groups.contains_key(&group.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        Ok(self.inner.read().await.groups.get(&id).cloned())
    }

    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.groups.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        inner.memberships.retain(|(group_id, _), _| *group_id != id);
        inner.group_requests.retain(|_, r| r.group_id != id);
        inner.messages.retain(|m| m.group_id != Some(id));
        Ok(())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Group>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .keys()
            .filter(|(_, user_id)| *user_id == user)
            .filter_map(|(group_id, _)| inner.groups.get(group_id).cloned())
            .collect())
    }

    async fn search_public(&self, query: &str) -> Result<Vec<Group>, RepositoryError> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .groups
            .values()
            .filter(|g| g.is_public && g.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupMembershipRepository for MemoryStore {
    async fn insert(
        &self,
        membership: GroupMembership,
    ) -> Result<GroupMembership, RepositoryError> {
        let mut inner = self.inner.write().await;
        let key = (membership.group_id, membership.user_id);
        if inner.memberships.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        inner.memberships.insert(key, membership.clone());
        Ok(membership)
    }

    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupMembership>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .memberships
            .get(&(group, user))
            .cloned())
    }

    async fn remove(&self, group: GroupId, user: UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner
            .memberships
            .remove(&(group, user))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_members(&self, group: GroupId) -> Result<Vec<GroupMembership>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .values()
            .filter(|m| m.group_id == group)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupRequestRepository for MemoryStore {
    async fn create(&self, request: GroupRequest) -> Result<GroupRequest, RepositoryError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .group_requests
            .values()
            .any(|r| r.group_id == request.group_id && r.user_id == request.user_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        inner.group_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .group_requests
            .values()
            .find(|r| r.group_id == group && r.user_id == user)
            .cloned())
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<GroupRequest>, RepositoryError> {
        Ok(self.inner.read().await.group_requests.get(&id).cloned())
    }

    async fn list_pending_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<GroupRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .group_requests
            .values()
            .filter(|r| r.user_id == user && r.status == GroupRequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        id: RequestId,
        status: GroupRequestStatus,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .group_requests
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = status;
        Ok(())
    }

    async fn accept_invitation(
        &self,
        id: RequestId,
        membership: GroupMembership,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        {
            let request = inner
                .group_requests
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound)?;
            request.status = GroupRequestStatus::Accepted;
        }
        inner
            .memberships
            .insert((membership.group_id, membership.user_id), membership);
        Ok(())
    }

    async fn delete(&self, id: RequestId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner
            .group_requests
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == Some(b))
                    || (m.sender_id == b && m.receiver_id == Some(a))
            })
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn list_for_group(&self, group: GroupId) -> Result<Vec<Message>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.group_id == Some(group))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn create(&self, file: FileRecord) -> Result<FileRecord, RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, RepositoryError> {
        Ok(self.inner.read().await.files.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.files.get(id).cloned())
            .collect())
    }
}

/// 不落盘的文件存储，测试用。
#[derive(Clone, Default)]
pub struct MemoryFileStore;

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn store(
        &self,
        original_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<StoredUpload, FileStoreError> {
        let provider_id = format!("{}-{}", Uuid::new_v4(), original_name);
        Ok(StoredUpload {
            url: format!("/uploads/{provider_id}"),
            provider_id,
        })
    }
}
