//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP 请求委托给应用层的用例服务，
//! 并通过 WebSocket 端点驱动在线状态与事件分发引擎。

mod auth;
mod error;
mod routes;
mod state;
mod websocket;

pub use auth::{JwtService, LoginResponse};
pub use config::JwtConfig;
pub use error::{catalog, ApiError};
pub use routes::router;
pub use state::AppState;
