//! 数据库迁移。SQL 文件位于仓库根目录的 `migrations/`。

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
