use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use reqwest::Client;
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot};
use uuid::Uuid;

use application::{
    memory::{MemoryFileStore, MemoryStore},
    AuthService, AuthServiceDependencies, Clock, FanoutEngine, FanoutEngineDependencies,
    FileStore, FriendService, FriendServiceDependencies, GroupService, GroupServiceDependencies,
    MessageService, MessageServiceDependencies, PasswordHasher, SearchService,
    SearchServiceDependencies, SystemClock, UserService, UserServiceDependencies,
};
use infrastructure::BcryptPasswordHasher;
use web_api::{router, AppState, JwtConfig, JwtService};

/// 在内存存储上组装完整路由，测试不需要数据库。
pub fn build_router() -> Router {
    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // 低 cost 只为测试提速
    let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(Some(4)));
    let file_store: Arc<dyn FileStore> = Arc::new(MemoryFileStore);

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "integration-test-secret-key-at-least-32-chars".to_string(),
        expiration_hours: 1,
    }));

    let engine = Arc::new(FanoutEngine::new(FanoutEngineDependencies {
        identity_resolver: jwt_service.clone(),
        users: store.clone(),
    }));

    let auth_service = Arc::new(AuthService::new(AuthServiceDependencies {
        user_repository: store.clone(),
        password_hasher: hasher.clone(),
        clock: clock.clone(),
    }));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: store.clone(),
        password_hasher: hasher.clone(),
    }));
    let friend_service = Arc::new(FriendService::new(FriendServiceDependencies {
        user_repository: store.clone(),
        friend_request_repository: store.clone(),
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
        user_repository: store.clone(),
        group_repository: store.clone(),
        membership_repository: store.clone(),
        group_request_repository: store.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        user_repository: store.clone(),
        group_repository: store.clone(),
        membership_repository: store.clone(),
        message_repository: store.clone(),
        file_repository: store.clone(),
        file_store,
        clock: clock.clone(),
    }));
    let search_service = Arc::new(SearchService::new(SearchServiceDependencies {
        user_repository: store.clone(),
        group_repository: store.clone(),
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

    router(state)
}

/// 绑定临时端口启动服务，返回地址和关闭句柄。
pub async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>) {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    (addr, shutdown_tx)
}

/// 注册并登录一个用户，返回 (用户 id, token)。
pub async fn signup_and_login(client: &Client, base: &str, pseudo: &str) -> (Uuid, String) {
    let email = format!("{}@example.com", pseudo);
    let user = client
        .post(format!("{}/api/v1/auth/signup", base))
        .json(&json!({
            "pseudo": pseudo,
            "email": email,
            "password": "secret-pass",
            "birthdate": "1990-01-01"
        }))
        .send()
        .await
        .expect("signup")
        .json::<serde_json::Value>()
        .await
        .expect("signup json");
    let user_id = user["id"]
        .as_str()
        .unwrap_or_else(|| panic!("signup failed: {:?}", user))
        .parse::<Uuid>()
        .unwrap();

    let login = client
        .post(format!("{}/api/v1/auth/login", base))
        .json(&json!({"email": email, "password": "secret-pass"}))
        .send()
        .await
        .expect("login")
        .json::<serde_json::Value>()
        .await
        .expect("login json");
    let token = login["token"]
        .as_str()
        .unwrap_or_else(|| panic!("login failed: {:?}", login))
        .to_owned();

    (user_id, token)
}

/// 把两个用户变成好友：a 发请求，b 接受。
pub async fn make_friends(
    client: &Client,
    base: &str,
    a_token: &str,
    b_id: Uuid,
    b_token: &str,
) {
    let request = client
        .post(format!("{}/api/v1/friends/requests/{}", base, b_id))
        .header("authorization", format!("Bearer {}", a_token))
        .send()
        .await
        .expect("send friend request")
        .json::<serde_json::Value>()
        .await
        .expect("request json");
    let request_id = request["id"]
        .as_str()
        .unwrap_or_else(|| panic!("friend request failed: {:?}", request))
        .to_owned();

    let response = client
        .put(format!("{}/api/v1/friends/requests/{}", base, request_id))
        .header("authorization", format!("Bearer {}", b_token))
        .json(&json!({"action": "accept"}))
        .send()
        .await
        .expect("accept friend request");
    assert!(response.status().is_success());
}
