use std::sync::Arc;

use application::{FileRepository, MessageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    BirthDate, FileId, FileRecord, Message, MessageContent, MessageId, PasswordHash, Pseudo,
    RepositoryError, User, UserEmail, UserId, UserStatus,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::friends::PgFriendRequestRepository;
use crate::groups::{PgGroupMembershipRepository, PgGroupRepository, PgGroupRequestRepository};

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            RepositoryError::Conflict
        }
        _ => RepositoryError::storage(err.to_string()),
    }
}

pub(crate) fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

const USER_COLUMNS: &str =
    "id, pseudo, email, password_hash, avatar_url, status, birthdate, friends, created_at";

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    pseudo: String,
    email: String,
    password_hash: String,
    avatar_url: Option<String>,
    status: String,
    birthdate: NaiveDate,
    friends: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let pseudo = Pseudo::parse(value.pseudo).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password = PasswordHash::new(value.password_hash)
            .map_err(|err| invalid_data(err.to_string()))?;
        let status = UserStatus::parse(&value.status)
            .ok_or_else(|| invalid_data(format!("unknown user status: {}", value.status)))?;

        Ok(User {
            id: UserId::from(value.id),
            pseudo,
            email,
            password,
            avatar_url: value.avatar_url,
            status,
            birthdate: BirthDate::from_stored(value.birthdate),
            friends: value.friends.into_iter().map(UserId::from).collect(),
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, pseudo, email, password_hash, avatar_url, status, birthdate, friends, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(user.id))
        .bind(user.pseudo.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.avatar_url)
        .bind(user.status.as_str())
        .bind(user.birthdate.as_date())
        .bind(user.friends.iter().copied().map(Uuid::from).collect::<Vec<_>>())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET pseudo = $2, email = $3, password_hash = $4, avatar_url = $5, status = $6, friends = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(user.id))
        .bind(user.pseudo.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.avatar_url)
        .bind(user.status.as_str())
        .bind(user.friends.iter().copied().map(Uuid::from).collect::<Vec<_>>())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#,
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#,
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_pseudo(&self, pseudo: Pseudo) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE pseudo = $1"#,
        ))
        .bind(pseudo.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().copied().map(Uuid::from).collect();
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"#,
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn get_friend_ids(&self, id: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let friends: Option<Vec<Uuid>> =
            sqlx::query_scalar(r#"SELECT friends FROM users WHERE id = $1"#)
                .bind(Uuid::from(id))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        friends
            .map(|ids| ids.into_iter().map(UserId::from).collect())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE users SET status = $2 WHERE id = $1"#)
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

    async fn search_by_pseudo(&self, query: &str) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE pseudo ILIKE $1 ORDER BY pseudo"#,
        ))
        .bind(format!("%{query}%"))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 先把该用户从所有好友列表移除，其余关联数据由外键级联删除
        sqlx::query(r#"UPDATE users SET friends = array_remove(friends, $1) WHERE friends @> ARRAY[$1]"#)
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_err)
    }
}

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, group_id, content, file_id, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Option<Uuid>,
    group_id: Option<Uuid>,
    content: Option<String>,
    file_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content = value
            .content
            .map(MessageContent::new)
            .transpose()
            .map_err(|err| invalid_data(err.to_string()))?;

        Message::restore(
            MessageId::from(value.id),
            UserId::from(value.sender_id),
            value.receiver_id.map(UserId::from),
            value.group_id.map(domain::GroupId::from),
            content,
            value.file_id.map(FileId::from),
            value.created_at,
        )
        .map_err(|err| invalid_data(err.to_string()))
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, group_id, content, file_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.receiver_id.map(Uuid::from))
        .bind(message.group_id.map(Uuid::from))
        .bind(message.content.as_ref().map(|c| c.as_str()))
        .bind(message.file_id.map(Uuid::from))
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC
            "#,
        ))
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn list_for_group(
        &self,
        group: domain::GroupId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE group_id = $1
            ORDER BY created_at ASC
            "#,
        ))
        .bind(Uuid::from(group))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    uploader_id: Uuid,
    url: String,
    provider_id: String,
    created_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(value: FileRow) -> Self {
        FileRecord {
            id: FileId::from(value.id),
            uploader_id: UserId::from(value.uploader_id),
            url: value.url,
            provider_id: value.provider_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, file: FileRecord) -> Result<FileRecord, RepositoryError> {
        let record = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (id, uploader_id, url, provider_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, uploader_id, url, provider_id, created_at
            "#,
        )
        .bind(Uuid::from(file.id))
        .bind(Uuid::from(file.uploader_id))
        .bind(&file.url)
        .bind(&file.provider_id)
        .bind(file.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(FileRecord::from(record))
    }

    async fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, FileRow>(
            r#"SELECT id, uploader_id, url, provider_id, created_at FROM files WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(FileRecord::from))
    }

    async fn find_many(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().copied().map(Uuid::from).collect();
        let records = sqlx::query_as::<_, FileRow>(
            r#"SELECT id, uploader_id, url, provider_id, created_at FROM files WHERE id = ANY($1)"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(FileRecord::from).collect())
    }
}

/// 一把 Pg 连接池上的全部仓储。
#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub friend_request_repository: Arc<PgFriendRequestRepository>,
    pub group_repository: Arc<PgGroupRepository>,
    pub membership_repository: Arc<PgGroupMembershipRepository>,
    pub group_request_repository: Arc<PgGroupRequestRepository>,
    pub message_repository: Arc<PgMessageRepository>,
    pub file_repository: Arc<PgFileRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            friend_request_repository: Arc::new(PgFriendRequestRepository::new(pool.clone())),
            group_repository: Arc::new(PgGroupRepository::new(pool.clone())),
            membership_repository: Arc::new(PgGroupMembershipRepository::new(pool.clone())),
            group_request_repository: Arc::new(PgGroupRequestRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            file_repository: Arc::new(PgFileRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
