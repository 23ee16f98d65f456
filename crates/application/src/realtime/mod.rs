//! 在线状态与事件分发引擎。
//!
//! 一个客户端只维持一条实时连接，通过 `join` 信号携带 bearer 凭证完成绑定
//! （连接 → 用户身份 → 个人频道）。之后的领域事件（状态变化、输入提示、
//! 消息投递）都由引擎查询关系存储来决定接收方集合，并向逻辑频道发送。
//!
//! 引擎不持有好友列表或成员关系的副本：接收方在每次信号到达时
//! 重新解析，避免过期数据导致的错误路由。

mod engine;
mod registry;
mod signal;

pub use engine::{FanoutEngine, FanoutEngineDependencies};
pub use registry::{ConnectionId, ConnectionRegistry, EventSender};
pub use signal::{ClientSignal, ServerEvent};
