//! 每连接的消息路由器
//!
//! 协议状态机：连接认证后，每个入站帧是一次原子请求，帧之间
//! 不保留操作级状态。处理过程中的任何错误都在分发边界被捕获，
//! 转为发给本连接的 ERROR 帧——既不中断连接，也不会泄漏到
//! 其他会话。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use application::SessionHandle;
use domain::entities::frame::ReadReceipt;
use domain::{ClientFrame, MessageKind, ServerFrame};

use crate::state::AppState;

/// 单条 WebSocket 连接的生命周期
///
/// 注册 → 逐帧路由 → 注销。注销是句柄匹配的：若本连接已被
/// 新会话顶替，晚到的关闭回调不会误删新会话。
pub struct WsConnection {
    state: AppState,
    user_id: Uuid,
    connection_id: Uuid,
}

impl WsConnection {
    pub fn new(state: AppState, user_id: Uuid) -> Self {
        Self {
            state,
            user_id,
            connection_id: Uuid::new_v4(),
        }
    }

    pub async fn run(self, socket: WebSocket) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

        // 注册当前连接；同用户的旧会话在注册表内被原子驱逐
        self.state
            .session_registry
            .register(
                self.user_id,
                SessionHandle::new(self.connection_id, tx.clone()),
            )
            .await;

        let (mut sender, mut incoming) = socket.split();

        // 发送任务：出站帧统一经 channel 串行写入 socket
        let mut send_task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let evicted = matches!(frame, ServerFrame::Offline { .. });
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if sender.send(WsMessage::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "出站帧序列化失败");
                        continue;
                    }
                }
                if evicted {
                    // 被新会话顶替：离线通知送达后立即关闭旧连接
                    break;
                }
            }
            let _ = sender.send(WsMessage::Close(None)).await;
        });

        let router = MessageRouter::new(self.state.clone(), self.user_id, tx);
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                match message {
                    WsMessage::Text(text) => router.handle_text(text.as_str()).await,
                    WsMessage::Close(_) => break,
                    WsMessage::Binary(_) => {
                        debug!("收到二进制帧，忽略");
                    }
                    // 底层协议栈自动应答 ping/pong
                    WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        self.state
            .session_registry
            .unregister(self.user_id, self.connection_id)
            .await;

        info!(user_id = %self.user_id, connection_id = %self.connection_id, "WebSocket 连接已断开");
    }
}

/// 入站帧的解码与分发
pub(crate) struct MessageRouter {
    state: AppState,
    user_id: Uuid,
    reply: mpsc::UnboundedSender<ServerFrame>,
}

impl MessageRouter {
    pub(crate) fn new(
        state: AppState,
        user_id: Uuid,
        reply: mpsc::UnboundedSender<ServerFrame>,
    ) -> Self {
        Self {
            state,
            user_id,
            reply,
        }
    }

    pub(crate) async fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(user_id = %self.user_id, error = %err, "无法解析的操作帧");
                self.reply(ServerFrame::error(decode_failure_message(text)));
                return;
            }
        };

        // 分发边界：处理错误转为 ERROR 帧，连接保持打开
        match self.dispatch(frame).await {
            Ok(Some(reply)) => self.reply(reply),
            Ok(None) => {}
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "操作处理失败");
                self.reply(ServerFrame::error(err.client_message()));
            }
        }
    }

    async fn dispatch(
        &self,
        frame: ClientFrame,
    ) -> Result<Option<ServerFrame>, application::ApplicationError> {
        match frame {
            ClientFrame::Ping => Ok(Some(ServerFrame::pong(Utc::now()))),

            ClientFrame::Message {
                to,
                content,
                message_type,
                talk_id: _,
            } => {
                let content = content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
                let (Some(to), Some(content)) = (to, content) else {
                    return Ok(Some(ServerFrame::error("incomplete message parameters")));
                };
                self.state
                    .chat_service
                    .send_message(
                        self.user_id,
                        to,
                        content,
                        message_type.unwrap_or(MessageKind::Text),
                    )
                    .await?;
                // 发送回执已由聊天服务经会话注册表送达本连接
                Ok(None)
            }

            ClientFrame::Read { talk_id } => {
                let Some(talk_id) = talk_id else {
                    return Ok(Some(ServerFrame::error("incomplete message parameters")));
                };
                let updated = self.state.chat_service.mark_read(self.user_id, talk_id).await?;
                Ok(Some(ServerFrame::Read {
                    result: ReadReceipt { talk_id, updated },
                }))
            }

            ClientFrame::Unread => {
                let data = self.state.chat_service.unread_messages(self.user_id).await?;
                Ok(Some(ServerFrame::UnRead { data }))
            }

            ClientFrame::History { to } => {
                let Some(to) = to else {
                    return Ok(Some(ServerFrame::error("incomplete message parameters")));
                };
                let data = self.state.chat_service.history_with(self.user_id, to).await?;
                Ok(Some(ServerFrame::History { data }))
            }
        }
    }

    fn reply(&self, frame: ServerFrame) {
        // 连接正在关闭时通道可能已满目全非，丢弃即可
        let _ = self.reply.send(frame);
    }
}

const KNOWN_OPERATIONS: [&str; 5] = ["PING", "MESSAGE", "READ", "UNREAD", "HISTORY"];

/// 区分解码失败的原因：操作本身未知，还是已知操作携带了
/// 无法解析的参数值（如非 uuid 的 to/talkId）
fn decode_failure_message(text: &str) -> &'static str {
    let known_operation = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| {
            value
                .get("operationType")
                .and_then(|tag| tag.as_str())
                .map(|tag| KNOWN_OPERATIONS.contains(&tag))
        })
        .unwrap_or(false);
    if known_operation {
        "incomplete message parameters"
    } else {
        "unsupported operation type"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use application::memory::{
        InMemoryMessageRepository, InMemoryTalkRepository, InMemoryUserRepository,
    };
    use application::{ChatService, ChatServiceDependencies, SessionRegistry, TalkService};
    use config::JwtConfig;

    use crate::auth::JwtService;

    fn test_state() -> AppState {
        let messages = Arc::new(InMemoryMessageRepository::new());
        let talks = Arc::new(InMemoryTalkRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let registry = Arc::new(SessionRegistry::new());
        let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
            message_repository: messages,
            talk_repository: talks.clone(),
            user_repository: users.clone(),
            session_registry: registry.clone(),
        }));
        let talk_service = Arc::new(TalkService::new(talks, users));
        let jwt_service = Arc::new(JwtService::new(JwtConfig {
            secret: "test-secret-key-with-at-least-32-characters!".to_string(),
            expiration_hours: 1,
        }));
        AppState::new(chat_service, talk_service, registry, jwt_service)
    }

    /// 注册一个连接并返回其路由器与出站帧接收端
    async fn connect(
        state: &AppState,
        user_id: Uuid,
    ) -> (MessageRouter, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .session_registry
            .register(user_id, SessionHandle::new(Uuid::new_v4(), tx.clone()))
            .await;
        (MessageRouter::new(state.clone(), user_id, tx), rx)
    }

    #[tokio::test]
    async fn ping_replies_pong_with_timestamp() {
        let state = test_state();
        let (router, mut rx) = connect(&state, Uuid::new_v4()).await;

        router.handle_text(r#"{"operationType":"PING"}"#).await;

        match rx.recv().await.unwrap() {
            ServerFrame::Pong { data } => assert!(data > 0),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_operation_keeps_connection_usable() {
        let state = test_state();
        let (router, mut rx) = connect(&state, Uuid::new_v4()).await;

        router.handle_text(r#"{"operationType":"TELEPORT"}"#).await;
        match rx.recv().await.unwrap() {
            ServerFrame::Error { error } => assert_eq!(error, "unsupported operation type"),
            other => panic!("unexpected frame: {:?}", other),
        }

        // 同一连接的后续操作照常工作
        router.handle_text(r#"{"operationType":"PING"}"#).await;
        assert!(matches!(rx.recv().await.unwrap(), ServerFrame::Pong { .. }));
    }

    #[tokio::test]
    async fn known_operation_with_malformed_value_is_a_parameter_error() {
        let state = test_state();
        let (router, mut rx) = connect(&state, Uuid::new_v4()).await;

        // 已知操作 + 非 uuid 的参数值：参数错误，而非未知操作
        router
            .handle_text(r#"{"operationType":"READ","talkId":"not-a-uuid"}"#)
            .await;
        match rx.recv().await.unwrap() {
            ServerFrame::Error { error } => assert_eq!(error, "incomplete message parameters"),
            other => panic!("unexpected frame: {:?}", other),
        }

        router
            .handle_text(r#"{"operationType":"MESSAGE","to":42,"content":"hi"}"#)
            .await;
        match rx.recv().await.unwrap() {
            ServerFrame::Error { error } => assert_eq!(error, "incomplete message parameters"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn message_without_recipient_or_content_is_rejected() {
        let state = test_state();
        let (router, mut rx) = connect(&state, Uuid::new_v4()).await;

        router
            .handle_text(r#"{"operationType":"MESSAGE","content":"hi"}"#)
            .await;
        match rx.recv().await.unwrap() {
            ServerFrame::Error { error } => assert_eq!(error, "incomplete message parameters"),
            other => panic!("unexpected frame: {:?}", other),
        }

        let to = Uuid::new_v4();
        router
            .handle_text(&format!(
                r#"{{"operationType":"MESSAGE","to":"{}","content":"   "}}"#,
                to
            ))
            .await;
        match rx.recv().await.unwrap() {
            ServerFrame::Error { error } => assert_eq!(error, "incomplete message parameters"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_pushes_to_online_recipient_and_acks_sender() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (alice_router, mut alice_rx) = connect(&state, alice).await;
        let (_bob_router, mut bob_rx) = connect(&state, bob).await;

        alice_router
            .handle_text(&format!(
                r#"{{"operationType":"MESSAGE","to":"{}","content":"hi"}}"#,
                bob
            ))
            .await;

        match bob_rx.recv().await.unwrap() {
            ServerFrame::Message { data: Some(view), .. } => assert_eq!(view.content, "hi"),
            other => panic!("unexpected frame: {:?}", other),
        }
        match alice_rx.recv().await.unwrap() {
            ServerFrame::Message {
                result: Some(receipt),
                ..
            } => assert_eq!(receipt.status, "sent"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn offline_recipient_recovers_via_unread_and_read_flow() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (alice_router, mut alice_rx) = connect(&state, alice).await;

        alice_router
            .handle_text(&format!(
                r#"{{"operationType":"MESSAGE","to":"{}","content":"offline msg"}}"#,
                bob
            ))
            .await;
        // 发送方仍收到回执
        assert!(matches!(
            alice_rx.recv().await.unwrap(),
            ServerFrame::Message { result: Some(_), .. }
        ));

        // 接收方之后连接并拉取未读
        let (bob_router, mut bob_rx) = connect(&state, bob).await;
        bob_router.handle_text(r#"{"operationType":"UNREAD"}"#).await;
        let talk_id = match bob_rx.recv().await.unwrap() {
            ServerFrame::UnRead { data } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].content, "offline msg");
                data[0].talk_id
            }
            other => panic!("unexpected frame: {:?}", other),
        };

        // 标记已读后未读清空
        bob_router
            .handle_text(&format!(
                r#"{{"operationType":"READ","talkId":"{}"}}"#,
                talk_id
            ))
            .await;
        match bob_rx.recv().await.unwrap() {
            ServerFrame::Read { result } => {
                assert_eq!(result.talk_id, talk_id);
                assert_eq!(result.updated, 1);
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        bob_router.handle_text(r#"{"operationType":"UNREAD"}"#).await;
        match bob_rx.recv().await.unwrap() {
            ServerFrame::UnRead { data } => assert!(data.is_empty()),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_on_unknown_talk_is_noop_success() {
        let state = test_state();
        let (router, mut rx) = connect(&state, Uuid::new_v4()).await;

        router
            .handle_text(&format!(
                r#"{{"operationType":"READ","talkId":"{}"}}"#,
                Uuid::new_v4()
            ))
            .await;
        match rx.recv().await.unwrap() {
            ServerFrame::Read { result } => assert_eq!(result.updated, 0),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn history_is_chronological_over_the_wire() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (alice_router, mut alice_rx) = connect(&state, alice).await;

        for i in 0..3 {
            alice_router
                .handle_text(&format!(
                    r#"{{"operationType":"MESSAGE","to":"{}","content":"m{}"}}"#,
                    bob, i
                ))
                .await;
            // 消耗回执
            let _ = alice_rx.recv().await.unwrap();
        }

        alice_router
            .handle_text(&format!(r#"{{"operationType":"HISTORY","to":"{}"}}"#, bob))
            .await;
        match alice_rx.recv().await.unwrap() {
            ServerFrame::History { data } => {
                let contents: Vec<&str> = data.iter().map(|m| m.content.as_str()).collect();
                assert_eq!(contents, vec!["m0", "m1", "m2"]);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
