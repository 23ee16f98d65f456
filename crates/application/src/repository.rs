use async_trait::async_trait;
use domain::{
    FileId, FileRecord, FriendRequest, Group, GroupId, GroupMembership, GroupRequest,
    GroupRequestStatus, Message, Pseudo, RepositoryError, RequestId, User, UserEmail, UserId,
    UserStatus,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn find_by_pseudo(&self, pseudo: Pseudo) -> Result<Option<User>, RepositoryError>;
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;

    // 好友列表随时独立于连接生命周期变化，分发引擎每次都重新读取
    async fn get_friend_ids(&self, id: UserId) -> Result<Vec<UserId>, RepositoryError>;
    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), RepositoryError>;

    async fn search_by_pseudo(&self, query: &str) -> Result<Vec<User>, RepositoryError>;

    // 删除账号：级联好友请求、成员关系、消息，并把该用户从所有好友列表中移除
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FriendRequestRepository: Send + Sync {
    async fn create(&self, request: FriendRequest) -> Result<FriendRequest, RepositoryError>;
    async fn find_by_id(&self, id: RequestId) -> Result<Option<FriendRequest>, RepositoryError>;

    // 两个方向都算：A→B 或 B→A
    async fn find_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, RepositoryError>;

    async fn list_pending_for(&self, user: UserId) -> Result<Vec<FriendRequest>, RepositoryError>;
    async fn mark_denied(&self, id: RequestId) -> Result<(), RepositoryError>;

    /// 三路原子更新：请求置 ACCEPTED，双方好友列表互相加入。
    /// 不允许出现部分生效的中间状态。
    async fn accept(
        &self,
        id: RequestId,
        sender: UserId,
        receiver: UserId,
    ) -> Result<(), RepositoryError>;

    /// 原子解除好友：删除已接受的请求行，双方好友列表互相移除。
    async fn unfriend(&self, a: UserId, b: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// 事务性地创建群组和 owner 的管理员成员记录。
    async fn create_with_owner(
        &self,
        group: Group,
        owner: GroupMembership,
    ) -> Result<Group, RepositoryError>;
    async fn update(&self, group: Group) -> Result<Group, RepositoryError>;
    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError>;

    // 级联删除成员关系、邀请和消息
    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError>;

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Group>, RepositoryError>;
    async fn search_public(&self, query: &str) -> Result<Vec<Group>, RepositoryError>;
}

#[async_trait]
pub trait GroupMembershipRepository: Send + Sync {
    async fn insert(&self, membership: GroupMembership)
        -> Result<GroupMembership, RepositoryError>;
    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupMembership>, RepositoryError>;
    async fn remove(&self, group: GroupId, user: UserId) -> Result<(), RepositoryError>;
    async fn list_members(&self, group: GroupId) -> Result<Vec<GroupMembership>, RepositoryError>;
}

#[async_trait]
pub trait GroupRequestRepository: Send + Sync {
    async fn create(&self, request: GroupRequest) -> Result<GroupRequest, RepositoryError>;
    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupRequest>, RepositoryError>;
    async fn find_by_id(&self, id: RequestId) -> Result<Option<GroupRequest>, RepositoryError>;
    async fn list_pending_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<GroupRequest>, RepositoryError>;
    async fn set_status(
        &self,
        id: RequestId,
        status: GroupRequestStatus,
    ) -> Result<(), RepositoryError>;

    /// 原子：邀请置 ACCEPTED，同时插入成员关系。
    async fn accept_invitation(
        &self,
        id: RequestId,
        membership: GroupMembership,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, id: RequestId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;

    // 双向的私聊历史，按创建时间升序
    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn list_for_group(&self, group: GroupId) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: FileRecord) -> Result<FileRecord, RepositoryError>;
    async fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, RepositoryError>;
    async fn find_many(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, RepositoryError>;
}
