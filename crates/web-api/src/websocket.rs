//! WebSocket 端点。
//!
//! 升级后的连接只是一个传输管道：入站文本帧解析为客户端信号交给引擎，
//! 引擎路由出的事件经 mpsc 队列写回对端。业务授权在信号层完成，
//! 升级本身不要求凭证（未绑定的连接发什么都路由不到）。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use application::{ClientSignal, ConnectionId};

use crate::state::AppState;

pub async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::generate();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    state.engine.register_connection(connection_id, event_tx).await;

    let (mut sink, mut incoming) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize websocket event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = incoming.next().await {
        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                Ok(signal) => state.engine.handle_signal(connection_id, signal).await,
                // 未知或畸形信号丢弃，连接保持存活
                Err(err) => {
                    tracing::debug!(connection_id = %connection_id, error = %err, "dropping malformed signal");
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    state.engine.handle_disconnect(connection_id).await;
    send_task.abort();
}
