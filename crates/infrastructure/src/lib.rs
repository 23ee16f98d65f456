//! 基础设施层实现。
//!
//! 提供数据库仓储、密码哈希、文件存储等适配器，实现应用层定义的端口。

pub mod file_store;
pub mod friends;
pub mod groups;
pub mod migrations;
pub mod password;
pub mod repository;

pub use file_store::DiskFileStore;
pub use migrations::MIGRATOR;
pub use friends::PgFriendRequestRepository;
pub use groups::{PgGroupMembershipRepository, PgGroupRepository, PgGroupRequestRepository};
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, PgFileRepository, PgMessageRepository, PgStorage, PgUserRepository,
};
