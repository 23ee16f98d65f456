use application::FriendRequestRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{FriendRequest, FriendRequestStatus, RepositoryError, RequestId, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{invalid_data, map_sqlx_err};

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

#[derive(Debug, FromRow)]
struct FriendRequestRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<FriendRequestRecord> for FriendRequest {
    type Error = RepositoryError;

    fn try_from(value: FriendRequestRecord) -> Result<Self, Self::Error> {
        let status = FriendRequestStatus::parse(&value.status)
            .ok_or_else(|| invalid_data(format!("unknown request status: {}", value.status)))?;
        Ok(FriendRequest {
            id: RequestId::from(value.id),
            sender_id: UserId::from(value.sender_id),
            receiver_id: UserId::from(value.receiver_id),
            status,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgFriendRequestRepository {
    pool: PgPool,
}

impl PgFriendRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendRequestRepository for PgFriendRequestRepository {
    async fn create(&self, request: FriendRequest) -> Result<FriendRequest, RepositoryError> {
        let record = sqlx::query_as::<_, FriendRequestRecord>(&format!(
            r#"
            INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(request.id))
        .bind(Uuid::from(request.sender_id))
        .bind(Uuid::from(request.receiver_id))
        .bind(request.status.as_str())
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        FriendRequest::try_from(record)
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FriendRequest>, RepositoryError> {
        let record = sqlx::query_as::<_, FriendRequestRecord>(&format!(
            r#"SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1"#,
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(FriendRequest::try_from).transpose()
    }

    async fn find_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, RepositoryError> {
        let record = sqlx::query_as::<_, FriendRequestRecord>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM friend_requests
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            "#,
        ))
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(FriendRequest::try_from).transpose()
    }

    async fn list_pending_for(
        &self,
        user: UserId,
    ) -> Result<Vec<FriendRequest>, RepositoryError> {
        let records = sqlx::query_as::<_, FriendRequestRecord>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM friend_requests
            WHERE status = 'PENDING' AND (sender_id = $1 OR receiver_id = $1)
            ORDER BY created_at ASC
            "#,
        ))
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(FriendRequest::try_from).collect()
    }

    async fn mark_denied(&self, id: RequestId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE friend_requests SET status = 'DENIED' WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn accept(
        &self,
        id: RequestId,
        sender: UserId,
        receiver: UserId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let result =
            sqlx::query(r#"UPDATE friend_requests SET status = 'ACCEPTED' WHERE id = $1"#)
                .bind(Uuid::from(id))
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // 幂等：已在列表中的不重复追加
        for (owner, friend) in [(sender, receiver), (receiver, sender)] {
            sqlx::query(
                r#"
                UPDATE users SET friends = array_append(friends, $2)
                WHERE id = $1 AND NOT friends @> ARRAY[$2]
                "#,
            )
            .bind(Uuid::from(owner))
            .bind(Uuid::from(friend))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn unfriend(&self, a: UserId, b: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            DELETE FROM friend_requests
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            "#,
        )
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for (owner, friend) in [(a, b), (b, a)] {
            sqlx::query(r#"UPDATE users SET friends = array_remove(friends, $2) WHERE id = $1"#)
                .bind(Uuid::from(owner))
                .bind(Uuid::from(friend))
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)
    }
}
