//! 主应用程序入口
//!
//! 加载配置、连接数据库并启动 Axum Web 服务。

use std::sync::Arc;

use application::{
    AuthService, AuthServiceDependencies, Clock, FanoutEngine, FanoutEngineDependencies,
    FileStore, FriendService, FriendServiceDependencies, GroupService, GroupServiceDependencies,
    MessageService, MessageServiceDependencies, PasswordHasher, SearchService,
    SearchServiceDependencies, SystemClock, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, DiskFileStore, PgStorage, MIGRATOR,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 配置无效时直接拒绝启动
    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        database = config.database.url.split('@').last().unwrap_or("unknown"),
        "connecting to database"
    );
    let pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
    MIGRATOR.run(&pool).await?;

    let storage = PgStorage::new(pool);

    let password_hasher: Arc<dyn PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let file_store: Arc<dyn FileStore> = Arc::new(DiskFileStore::new(
        &config.uploads.dir,
        &config.uploads.base_url,
    ));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    // 实时引擎用 JWT 服务解析 join 凭证，用用户仓储解析接收方
    let engine = Arc::new(FanoutEngine::new(FanoutEngineDependencies {
        identity_resolver: jwt_service.clone(),
        users: storage.user_repository.clone(),
    }));

    let auth_service = Arc::new(AuthService::new(AuthServiceDependencies {
        user_repository: storage.user_repository.clone(),
        password_hasher: password_hasher.clone(),
        clock: clock.clone(),
    }));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: storage.user_repository.clone(),
        password_hasher: password_hasher.clone(),
    }));
    let friend_service = Arc::new(FriendService::new(FriendServiceDependencies {
        user_repository: storage.user_repository.clone(),
        friend_request_repository: storage.friend_request_repository.clone(),
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
        user_repository: storage.user_repository.clone(),
        group_repository: storage.group_repository.clone(),
        membership_repository: storage.membership_repository.clone(),
        group_request_repository: storage.group_request_repository.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        user_repository: storage.user_repository.clone(),
        group_repository: storage.group_repository.clone(),
        membership_repository: storage.membership_repository.clone(),
        message_repository: storage.message_repository.clone(),
        file_repository: storage.file_repository.clone(),
        file_store,
        clock: clock.clone(),
    }));
    let search_service = Arc::new(SearchService::new(SearchServiceDependencies {
        user_repository: storage.user_repository.clone(),
        group_repository: storage.group_repository.clone(),
    }));

    let state = AppState {
        auth_service,
        user_service,
        friend_service,
        group_service,
        message_service,
        search_service,
        engine,
        jwt_service,
    };

    let app = router(state);
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(%address, "parley server started");
    axum::serve(listener, app).await?;

    Ok(())
}
