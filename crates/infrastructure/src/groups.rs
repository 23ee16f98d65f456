use application::{GroupMembershipRepository, GroupRepository, GroupRequestRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Group, GroupId, GroupMembership, GroupRequest, GroupRequestStatus, GroupRole, RepositoryError,
    RequestId, UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{invalid_data, map_sqlx_err};

const GROUP_COLUMNS: &str = "id, name, is_public, owner_id, created_at";

#[derive(Debug, FromRow)]
struct GroupRecord {
    id: Uuid,
    name: String,
    is_public: bool,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<GroupRecord> for Group {
    fn from(value: GroupRecord) -> Self {
        Group {
            id: GroupId::from(value.id),
            name: value.name,
            is_public: value.is_public,
            owner_id: UserId::from(value.owner_id),
            created_at: value.created_at,
        }
    }
}

const MEMBERSHIP_COLUMNS: &str = "group_id, user_id, role, joined_at";

#[derive(Debug, FromRow)]
struct MembershipRecord {
    group_id: Uuid,
    user_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MembershipRecord> for GroupMembership {
    type Error = RepositoryError;

    fn try_from(value: MembershipRecord) -> Result<Self, Self::Error> {
        let role = GroupRole::parse(&value.role)
            .ok_or_else(|| invalid_data(format!("unknown group role: {}", value.role)))?;
        Ok(GroupMembership {
            group_id: GroupId::from(value.group_id),
            user_id: UserId::from(value.user_id),
            role,
            joined_at: value.joined_at,
        })
    }
}

const GROUP_REQUEST_COLUMNS: &str = "id, group_id, user_id, status, created_at";

#[derive(Debug, FromRow)]
struct GroupRequestRecord {
    id: Uuid,
    group_id: Uuid,
    user_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GroupRequestRecord> for GroupRequest {
    type Error = RepositoryError;

    fn try_from(value: GroupRequestRecord) -> Result<Self, Self::Error> {
        let status = GroupRequestStatus::parse(&value.status)
            .ok_or_else(|| invalid_data(format!("unknown invitation status: {}", value.status)))?;
        Ok(GroupRequest {
            id: RequestId::from(value.id),
            group_id: GroupId::from(value.group_id),
            user_id: UserId::from(value.user_id),
            status,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create_with_owner(
        &self,
        group: Group,
        owner: GroupMembership,
    ) -> Result<Group, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"
            INSERT INTO groups (id, name, is_public, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {GROUP_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(group.is_public)
        .bind(Uuid::from(group.owner_id))
        .bind(group.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::from(owner.group_id))
        .bind(Uuid::from(owner.user_id))
        .bind(owner.role.as_str())
        .bind(owner.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(Group::from(record))
    }

    async fn update(&self, group: Group) -> Result<Group, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"
            UPDATE groups SET name = $2, is_public = $3, owner_id = $4
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(group.is_public)
        .bind(Uuid::from(group.owner_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Group::from(record))
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"#,
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Group::from))
    }

    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError> {
        // 成员关系、邀请和消息由外键级联删除
        let result = sqlx::query(r#"DELETE FROM groups WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Group>, RepositoryError> {
        let records = sqlx::query_as::<_, GroupRecord>(
            r#"
            SELECT g.id, g.name, g.is_public, g.owner_id, g.created_at
            FROM groups g
            JOIN group_memberships m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.created_at ASC
            "#,
        )
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Group::from).collect())
    }

    async fn search_public(&self, query: &str) -> Result<Vec<Group>, RepositoryError> {
        let records = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"
            SELECT {GROUP_COLUMNS} FROM groups
            WHERE is_public AND name ILIKE $1
            ORDER BY name
            "#,
        ))
        .bind(format!("%{query}%"))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Group::from).collect())
    }
}

#[derive(Clone)]
pub struct PgGroupMembershipRepository {
    pool: PgPool,
}

impl PgGroupMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupMembershipRepository for PgGroupMembershipRepository {
    async fn insert(
        &self,
        membership: GroupMembership,
    ) -> Result<GroupMembership, RepositoryError> {
        let record = sqlx::query_as::<_, MembershipRecord>(&format!(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(membership.group_id))
        .bind(Uuid::from(membership.user_id))
        .bind(membership.role.as_str())
        .bind(membership.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        GroupMembership::try_from(record)
    }

    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupMembership>, RepositoryError> {
        let record = sqlx::query_as::<_, MembershipRecord>(&format!(
            r#"SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE group_id = $1 AND user_id = $2"#,
        ))
        .bind(Uuid::from(group))
        .bind(Uuid::from(user))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(GroupMembership::try_from).transpose()
    }

    async fn remove(&self, group: GroupId, user: UserId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query(r#"DELETE FROM group_memberships WHERE group_id = $1 AND user_id = $2"#)
                .bind(Uuid::from(group))
                .bind(Uuid::from(user))
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_members(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupMembership>, RepositoryError> {
        let records = sqlx::query_as::<_, MembershipRecord>(&format!(
            r#"SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE group_id = $1 ORDER BY joined_at ASC"#,
        ))
        .bind(Uuid::from(group))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(GroupMembership::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgGroupRequestRepository {
    pool: PgPool,
}

impl PgGroupRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRequestRepository for PgGroupRequestRepository {
    async fn create(&self, request: GroupRequest) -> Result<GroupRequest, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRequestRecord>(&format!(
            r#"
            INSERT INTO group_requests (id, group_id, user_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {GROUP_REQUEST_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(request.id))
        .bind(Uuid::from(request.group_id))
        .bind(Uuid::from(request.user_id))
        .bind(request.status.as_str())
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        GroupRequest::try_from(record)
    }

    async fn find(
        &self,
        group: GroupId,
        user: UserId,
    ) -> Result<Option<GroupRequest>, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRequestRecord>(&format!(
            r#"SELECT {GROUP_REQUEST_COLUMNS} FROM group_requests WHERE group_id = $1 AND user_id = $2"#,
        ))
        .bind(Uuid::from(group))
        .bind(Uuid::from(user))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(GroupRequest::try_from).transpose()
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<GroupRequest>, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRequestRecord>(&format!(
            r#"SELECT {GROUP_REQUEST_COLUMNS} FROM group_requests WHERE id = $1"#,
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(GroupRequest::try_from).transpose()
    }

    async fn list_pending_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<GroupRequest>, RepositoryError> {
        let records = sqlx::query_as::<_, GroupRequestRecord>(&format!(
            r#"
            SELECT {GROUP_REQUEST_COLUMNS} FROM group_requests
            WHERE user_id = $1 AND status = 'PENDING'
            ORDER BY created_at ASC
            "#,
        ))
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(GroupRequest::try_from).collect()
    }

    async fn set_status(
        &self,
        id: RequestId,
        status: GroupRequestStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE group_requests SET status = $2 WHERE id = $1"#)
            .bind(Uuid::from(id))
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn accept_invitation(
        &self,
        id: RequestId,
        membership: GroupMembership,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let result = sqlx::query(r#"UPDATE group_requests SET status = 'ACCEPTED' WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(membership.group_id))
        .bind(Uuid::from(membership.user_id))
        .bind(membership.role.as_str())
        .bind(membership.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn delete(&self, id: RequestId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM group_requests WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
