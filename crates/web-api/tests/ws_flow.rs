mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};

use support::{make_friends, signup_and_login, spawn_server};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_ws(addr: std::net::SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}/api/v1/ws", addr))
        .await
        .expect("ws connect");
    ws
}

async fn send_signal(ws: &mut Ws, signal: serde_json::Value) {
    ws.send(TungsteniteMessage::Text(signal.to_string().into()))
        .await
        .expect("send signal");
}

async fn next_event(ws: &mut Ws) -> serde_json::Value {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("ws error");
        if let TungsteniteMessage::Text(payload) = message {
            return serde_json::from_str(&payload).expect("event json");
        }
    }
}

#[tokio::test]
async fn presence_typing_and_messages_reach_friends() {
    let (addr, shutdown) = spawn_server().await;
    let base = format!("http://{}", addr);
    let client = Client::new();

    let (alice_id, alice_token) = signup_and_login(&client, &base, "ws_alice").await;
    let (bob_id, bob_token) = signup_and_login(&client, &base, "ws_bob").await;
    make_friends(&client, &base, &alice_token, bob_id, &bob_token).await;

    let mut bob_ws = connect_ws(addr).await;
    send_signal(&mut bob_ws, json!({"type": "join", "token": bob_token})).await;
    sleep(Duration::from_millis(100)).await;

    let mut alice_ws = connect_ws(addr).await;
    send_signal(&mut alice_ws, json!({"type": "join", "token": alice_token})).await;

    // 好友上线广播
    let online = next_event(&mut bob_ws).await;
    assert_eq!(online["event"], "statusChanged");
    assert_eq!(online["data"]["userId"], alice_id.to_string());
    assert_eq!(online["data"]["status"], "ONLINE");

    // 输入提示
    send_signal(
        &mut alice_ws,
        json!({"type": "startTypingPrivate", "contactId": bob_id}),
    )
    .await;
    let typing = next_event(&mut bob_ws).await;
    assert_eq!(typing["event"], "startTypingPrivate");
    assert_eq!(typing["data"]["userId"], alice_id.to_string());

    // 私聊消息透传
    send_signal(
        &mut alice_ws,
        json!({
            "type": "privateMessage",
            "receiverId": bob_id,
            "message": {"content": "hi bob"}
        }),
    )
    .await;
    let message = next_event(&mut bob_ws).await;
    assert_eq!(message["event"], "privateMessageReceived");
    assert_eq!(message["data"]["content"], "hi bob");

    // 断开后好友收到下线广播
    alice_ws
        .close(None)
        .await
        .expect("close alice connection");
    let offline = next_event(&mut bob_ws).await;
    assert_eq!(offline["event"], "statusChanged");
    assert_eq!(offline["data"]["userId"], alice_id.to_string());
    assert_eq!(offline["data"]["status"], "OFFLINE");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn group_channel_routes_to_joined_members() {
    let (addr, shutdown) = spawn_server().await;
    let base = format!("http://{}", addr);
    let client = Client::new();

    let (_owner_id, owner_token) = signup_and_login(&client, &base, "wsg_owner").await;
    let (member_id, member_token) = signup_and_login(&client, &base, "wsg_member").await;

    let group = client
        .post(format!("{}/api/v1/groups", base))
        .header("authorization", format!("Bearer {}", owner_token))
        .json(&json!({"name": "ws-room", "isPublic": true}))
        .send()
        .await
        .expect("create group")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let group_id = group["id"].as_str().expect("id").to_owned();

    client
        .post(format!("{}/api/v1/groups/{}/join", base, group_id))
        .header("authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("join group");

    let mut owner_ws = connect_ws(addr).await;
    send_signal(&mut owner_ws, json!({"type": "join", "token": owner_token})).await;
    send_signal(&mut owner_ws, json!({"type": "joinGroup", "groupId": group_id})).await;

    let mut member_ws = connect_ws(addr).await;
    send_signal(&mut member_ws, json!({"type": "join", "token": member_token})).await;
    send_signal(&mut member_ws, json!({"type": "joinGroup", "groupId": group_id})).await;
    sleep(Duration::from_millis(100)).await;

    send_signal(
        &mut member_ws,
        json!({
            "type": "groupMessage",
            "groupId": group_id,
            "message": {"content": "hello room"}
        }),
    )
    .await;

    let received = next_event(&mut owner_ws).await;
    assert_eq!(received["event"], "groupMessageReceived");
    assert_eq!(received["data"]["content"], "hello room");

    // 群组频道也投递输入提示
    send_signal(
        &mut member_ws,
        json!({"type": "startTyping", "groupId": group_id}),
    )
    .await;
    let typing = next_event(&mut owner_ws).await;
    assert_eq!(typing["event"], "startTyping");
    assert_eq!(typing["data"]["userId"], member_id.to_string());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unauthenticated_connections_route_nothing() {
    let (addr, shutdown) = spawn_server().await;
    let base = format!("http://{}", addr);
    let client = Client::new();

    let (_alice_id, alice_token) = signup_and_login(&client, &base, "wsu_alice").await;
    let (bob_id, bob_token) = signup_and_login(&client, &base, "wsu_bob").await;
    make_friends(&client, &base, &alice_token, bob_id, &bob_token).await;

    let mut bob_ws = connect_ws(addr).await;
    send_signal(&mut bob_ws, json!({"type": "join", "token": bob_token})).await;
    sleep(Duration::from_millis(100)).await;

    // 伪造凭证的 join 不绑定连接，后续信号全部被忽略
    let mut intruder_ws = connect_ws(addr).await;
    send_signal(&mut intruder_ws, json!({"type": "join", "token": "forged"})).await;
    send_signal(
        &mut intruder_ws,
        json!({"type": "startTypingPrivate", "contactId": bob_id}),
    )
    .await;

    let nothing = timeout(Duration::from_millis(500), bob_ws.next()).await;
    assert!(nothing.is_err(), "bob should not receive intruder events");

    // 连接本身保持存活，畸形帧同样不致命
    send_signal(&mut intruder_ws, json!({"type": "selfDestruct"})).await;
    send_signal(&mut intruder_ws, json!({"type": "join", "token": alice_token})).await;

    let online = next_event(&mut bob_ws).await;
    assert_eq!(online["event"], "statusChanged");
    assert_eq!(online["data"]["status"], "ONLINE");

    let _ = shutdown.send(());
}
