use std::sync::Arc;

use domain::{
    DomainError, Group, GroupId, GroupMembership, GroupRequest, GroupRequestStatus, RequestId,
    User, UserId,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::dto::{GroupDto, GroupMemberDto, GroupRequestDto};
use crate::error::ApplicationError;
use crate::repository::{
    GroupMembershipRepository, GroupRepository, GroupRequestRepository, UserRepository,
};

#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

pub struct GroupServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub membership_repository: Arc<dyn GroupMembershipRepository>,
    pub group_request_repository: Arc<dyn GroupRequestRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 群组生命周期：创建、加入 / 退出、邀请、成员管理。
pub struct GroupService {
    deps: GroupServiceDependencies,
}

impl GroupService {
    pub fn new(deps: GroupServiceDependencies) -> Self {
        Self { deps }
    }

    async fn load_group(&self, id: GroupId) -> Result<Group, ApplicationError> {
        self.deps
            .group_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound.into())
    }

    async fn load_user(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    async fn membership_of(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<GroupMembership, ApplicationError> {
        self.deps
            .membership_repository
            .find(group, user)
            .await?
            .ok_or_else(|| DomainError::NotGroupMember.into())
    }

    /// 邀请和移出成员需要管理员身份。
    async fn require_admin(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<GroupMembership, ApplicationError> {
        let membership = self.membership_of(group, user).await?;
        if !membership.is_admin() {
            return Err(DomainError::NotGroupAdmin.into());
        }
        Ok(membership)
    }

    /// 创建群组，创建者以管理员身份成为首个成员，两者一并写入。
    pub async fn create(
        &self,
        owner_id: UserId,
        request: CreateGroupRequest,
    ) -> Result<GroupDto, ApplicationError> {
        self.load_user(owner_id).await?;
        let now = self.deps.clock.now();
        let group = Group::create(
            GroupId::from(Uuid::new_v4()),
            request.name,
            request.is_public,
            owner_id,
            now,
        )?;
        let owner = GroupMembership::admin(group.id, owner_id, now);
        let stored = self
            .deps
            .group_repository
            .create_with_owner(group, owner)
            .await?;
        tracing::info!(group_id = %stored.id, owner = %owner_id, "group created");
        Ok(GroupDto::from(&stored))
    }

    /// 改名和可见性调整只允许群主。
    pub async fn update(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        request: UpdateGroupRequest,
    ) -> Result<GroupDto, ApplicationError> {
        let mut group = self.load_group(group_id).await?;
        if !group.is_owned_by(actor_id) {
            return Err(DomainError::NotGroupOwner.into());
        }
        if let Some(name) = request.name {
            group.rename(name)?;
        }
        if let Some(is_public) = request.is_public {
            group.is_public = is_public;
        }
        let stored = self.deps.group_repository.update(group).await?;
        Ok(GroupDto::from(&stored))
    }

    /// 删除群组及其成员关系、邀请和消息。只允许群主。
    pub async fn delete(&self, actor_id: UserId, group_id: GroupId) -> Result<(), ApplicationError> {
        let group = self.load_group(group_id).await?;
        if !group.is_owned_by(actor_id) {
            return Err(DomainError::NotGroupOwner.into());
        }
        self.deps.group_repository.delete(group_id).await?;
        tracing::info!(group_id = %group_id, "group deleted");
        Ok(())
    }

    /// 主动加入。只有公开群组可以直接加入，私有群组走邀请。
    pub async fn join(&self, user_id: UserId, group_id: GroupId) -> Result<(), ApplicationError> {
        let group = self.load_group(group_id).await?;
        self.load_user(user_id).await?;
        if self
            .deps
            .membership_repository
            .find(group_id, user_id)
            .await?
            .is_some()
        {
            return Err(DomainError::AlreadyGroupMember.into());
        }
        if !group.is_public {
            return Err(DomainError::GroupIsPrivate.into());
        }
        let membership = GroupMembership::member(group_id, user_id, self.deps.clock.now());
        self.deps.membership_repository.insert(membership).await?;
        Ok(())
    }

    /// 退出群组。群主不能退出自己的群，只能删除它。
    pub async fn leave(&self, user_id: UserId, group_id: GroupId) -> Result<(), ApplicationError> {
        let group = self.load_group(group_id).await?;
        if group.is_owned_by(user_id) {
            return Err(DomainError::OwnerCannotLeave.into());
        }
        self.membership_of(group_id, user_id).await?;
        self.deps.membership_repository.remove(group_id, user_id).await?;
        Ok(())
    }

    pub async fn invite(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<GroupRequestDto, ApplicationError> {
        let group = self.load_group(group_id).await?;
        self.require_admin(group_id, actor_id).await?;
        let invitee = self.load_user(user_id).await?;

        if self
            .deps
            .membership_repository
            .find(group_id, user_id)
            .await?
            .is_some()
        {
            return Err(DomainError::AlreadyGroupMember.into());
        }
        if let Some(existing) = self
            .deps
            .group_request_repository
            .find(group_id, user_id)
            .await?
        {
            if existing.is_pending() {
                return Err(DomainError::InvitationAlreadySent.into());
            }
        }

        let request = GroupRequest::invite(
            RequestId::from(Uuid::new_v4()),
            group_id,
            user_id,
            self.deps.clock.now(),
        );
        let stored = self.deps.group_request_repository.create(request).await?;
        tracing::info!(group_id = %group_id, invitee = %user_id, "group invitation sent");
        Ok(GroupRequestDto::hydrate(&stored, &group, &invitee))
    }

    pub async fn list_invitations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GroupRequestDto>, ApplicationError> {
        let user = self.load_user(user_id).await?;
        let requests = self
            .deps
            .group_request_repository
            .list_pending_for_user(user_id)
            .await?;

        let mut dtos = Vec::with_capacity(requests.len());
        for request in &requests {
            // 群组已删除的邀请直接跳过
            let Some(group) = self
                .deps
                .group_repository
                .find_by_id(request.group_id)
                .await?
            else {
                continue;
            };
            dtos.push(GroupRequestDto::hydrate(request, &group, &user));
        }
        Ok(dtos)
    }

    /// 接受或拒绝邀请。只有被邀请人能表态，终态的邀请不能再表态。
    pub async fn answer_invitation(
        &self,
        user_id: UserId,
        request_id: RequestId,
        accept: bool,
    ) -> Result<(), ApplicationError> {
        let request = self
            .deps
            .group_request_repository
            .find_by_id(request_id)
            .await?
            .ok_or(DomainError::InvitationNotFound)?;
        if request.user_id != user_id {
            return Err(DomainError::NotRequestReceiver.into());
        }
        if !request.is_pending() {
            return Err(DomainError::InvitationResolved.into());
        }

        if accept {
            let membership =
                GroupMembership::member(request.group_id, user_id, self.deps.clock.now());
            self.deps
                .group_request_repository
                .accept_invitation(request_id, membership)
                .await?;
        } else {
            self.deps
                .group_request_repository
                .set_status(request_id, GroupRequestStatus::Rejected)
                .await?;
        }
        Ok(())
    }

    /// 撤回尚未表态的邀请。需要管理员身份。
    pub async fn cancel_invitation(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), ApplicationError> {
        self.load_group(group_id).await?;
        self.require_admin(group_id, actor_id).await?;
        let request = self
            .deps
            .group_request_repository
            .find(group_id, user_id)
            .await?
            .filter(|request| request.is_pending())
            .ok_or(DomainError::InvitationNotFound)?;
        self.deps.group_request_repository.delete(request.id).await?;
        Ok(())
    }

    /// 把成员移出群组。需要管理员身份，群主不能被移出。
    pub async fn exclude_member(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), ApplicationError> {
        let group = self.load_group(group_id).await?;
        self.require_admin(group_id, actor_id).await?;
        if group.is_owned_by(user_id) {
            return Err(DomainError::OwnerCannotLeave.into());
        }
        self.membership_of(group_id, user_id).await?;
        self.deps.membership_repository.remove(group_id, user_id).await?;
        tracing::info!(group_id = %group_id, user = %user_id, "member excluded");
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<GroupDto>, ApplicationError> {
        let groups = self.deps.group_repository.list_for_user(user_id).await?;
        Ok(groups.iter().map(GroupDto::from).collect())
    }

    /// 成员名单只对成员可见。
    pub async fn list_members(
        &self,
        actor_id: UserId,
        group_id: GroupId,
    ) -> Result<Vec<GroupMemberDto>, ApplicationError> {
        self.load_group(group_id).await?;
        self.membership_of(group_id, actor_id).await?;

        let memberships = self
            .deps
            .membership_repository
            .list_members(group_id)
            .await?;
        let ids: Vec<UserId> = memberships.iter().map(|m| m.user_id).collect();
        let users = self.deps.user_repository.find_many(&ids).await?;

        let mut dtos = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            let Some(user) = users.iter().find(|u| u.id == membership.user_id) else {
                continue;
            };
            dtos.push(GroupMemberDto::hydrate(membership, user));
        }
        Ok(dtos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, TimeZone, Utc};
    use domain::{BirthDate, PasswordHash, Pseudo, UserEmail};

    fn sample_user(pseudo: &str) -> User {
        User::register(
            User::next_id(),
            Pseudo::parse(pseudo).unwrap(),
            UserEmail::parse(&format!("{pseudo}@example.com")).unwrap(),
            PasswordHash::new("$2b$12$hash").unwrap(),
            BirthDate::from_stored(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn service(store: &MemoryStore) -> GroupService {
        GroupService::new(GroupServiceDependencies {
            user_repository: Arc::new(store.clone()),
            group_repository: Arc::new(store.clone()),
            membership_repository: Arc::new(store.clone()),
            group_request_repository: Arc::new(store.clone()),
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            )),
        })
    }

    async fn seed_users(store: &MemoryStore, pseudos: &[&str]) -> Vec<User> {
        let mut users = Vec::new();
        for pseudo in pseudos {
            let user = sample_user(pseudo);
            UserRepository::create(store, user.clone()).await.unwrap();
            users.push(user);
        }
        users
    }

    #[tokio::test]
    async fn creator_becomes_admin_member() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "rustaceans".to_owned(),
                    is_public: true,
                },
            )
            .await
            .unwrap();

        let members = service
            .list_members(users[0].id, GroupId::from(group.id))
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, domain::GroupRole::Admin);
    }

    #[tokio::test]
    async fn private_groups_require_an_invitation() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "secret-club".to_owned(),
                    is_public: false,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);

        let direct = service.join(users[1].id, group_id).await;
        assert!(matches!(
            direct,
            Err(ApplicationError::Domain(DomainError::GroupIsPrivate))
        ));

        let invitation = service
            .invite(users[0].id, group_id, users[1].id)
            .await
            .unwrap();
        service
            .answer_invitation(users[1].id, RequestId::from(invitation.id), true)
            .await
            .unwrap();

        let members = service.list_members(users[1].id, group_id).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn only_admins_can_invite() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob", "carol"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "open-club".to_owned(),
                    is_public: true,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);
        service.join(users[1].id, group_id).await.unwrap();

        let by_member = service.invite(users[1].id, group_id, users[2].id).await;
        assert!(matches!(
            by_member,
            Err(ApplicationError::Domain(DomainError::NotGroupAdmin))
        ));

        let by_outsider = service.invite(users[2].id, group_id, users[1].id).await;
        assert!(matches!(
            by_outsider,
            Err(ApplicationError::Domain(DomainError::NotGroupMember))
        ));
    }

    #[tokio::test]
    async fn duplicate_invitations_and_member_invites_are_rejected() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "club".to_owned(),
                    is_public: true,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);

        service
            .invite(users[0].id, group_id, users[1].id)
            .await
            .unwrap();
        let again = service.invite(users[0].id, group_id, users[1].id).await;
        assert!(matches!(
            again,
            Err(ApplicationError::Domain(
                DomainError::InvitationAlreadySent
            ))
        ));

        let self_invite = service.invite(users[0].id, group_id, users[0].id).await;
        assert!(matches!(
            self_invite,
            Err(ApplicationError::Domain(DomainError::AlreadyGroupMember))
        ));
    }

    #[tokio::test]
    async fn owner_cannot_leave_but_members_can() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "club".to_owned(),
                    is_public: true,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);
        service.join(users[1].id, group_id).await.unwrap();

        let owner_leave = service.leave(users[0].id, group_id).await;
        assert!(matches!(
            owner_leave,
            Err(ApplicationError::Domain(DomainError::OwnerCannotLeave))
        ));

        service.leave(users[1].id, group_id).await.unwrap();
        let members = service.list_members(users[0].id, group_id).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn exclude_requires_admin_and_spares_the_owner() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "club".to_owned(),
                    is_public: true,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);
        service.join(users[1].id, group_id).await.unwrap();

        let by_member = service
            .exclude_member(users[1].id, group_id, users[0].id)
            .await;
        assert!(matches!(
            by_member,
            Err(ApplicationError::Domain(DomainError::NotGroupAdmin))
        ));

        service
            .exclude_member(users[0].id, group_id, users[1].id)
            .await
            .unwrap();
        let members = service.list_members(users[0].id, group_id).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_invitations_and_memberships() {
        let store = MemoryStore::new();
        let users = seed_users(&store, &["alice", "bob"]).await;
        let service = service(&store);

        let group = service
            .create(
                users[0].id,
                CreateGroupRequest {
                    name: "club".to_owned(),
                    is_public: false,
                },
            )
            .await
            .unwrap();
        let group_id = GroupId::from(group.id);
        service
            .invite(users[0].id, group_id, users[1].id)
            .await
            .unwrap();

        let by_stranger = service.delete(users[1].id, group_id).await;
        assert!(matches!(
            by_stranger,
            Err(ApplicationError::Domain(DomainError::NotGroupOwner))
        ));

        service.delete(users[0].id, group_id).await.unwrap();
        assert!(service.list_invitations(users[1].id).await.unwrap().is_empty());
        assert!(service.list_for_user(users[0].id).await.unwrap().is_empty());
    }
}
