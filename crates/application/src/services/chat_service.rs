//! 聊天服务
//!
//! 消息收发的核心编排：解析会话、持久化、更新摘要缓存、
//! 推送在线接收方、回执发送方。持久化与推送是相互独立的步骤，
//! 各自失败各自处理——已持久化但推送失败的消息不会丢失，
//! 接收方下次连接时会通过未读/历史看到它。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use domain::repositories::{MessageRepository, TalkRepository, UserRepository};
use domain::{DomainError, Message, MessageKind, MessageView, NewMessage, ServerFrame, UserProfile};

use crate::error::ApplicationResult;
use crate::session_registry::{DeliverOutcome, SessionRegistry};

/// 历史查询单页上限
pub const HISTORY_PAGE_SIZE: u32 = 50;

pub struct ChatServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub talk_repository: Arc<dyn TalkRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub session_registry: Arc<SessionRegistry>,
}

pub struct ChatService {
    message_repository: Arc<dyn MessageRepository>,
    talk_repository: Arc<dyn TalkRepository>,
    user_repository: Arc<dyn UserRepository>,
    session_registry: Arc<SessionRegistry>,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self {
            message_repository: deps.message_repository,
            talk_repository: deps.talk_repository,
            user_repository: deps.user_repository,
            session_registry: deps.session_registry,
        }
    }

    /// 发送一条消息
    ///
    /// 成功后消息已持久化；向接收方的推送与向发送方的回执都是
    /// 尽力而为，离线即丢弃，不排队不重试。
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: String,
        kind: MessageKind,
    ) -> ApplicationResult<Message> {
        // 自发校验必须先于会话创建，避免产生退化的 {X,X} 会话行
        if sender_id == recipient_id {
            return Err(DomainError::validation_error("to", "不能给自己发送消息").into());
        }

        let talk = self
            .talk_repository
            .get_or_create(sender_id, recipient_id)
            .await?;
        let new_message = NewMessage::new(talk.id, sender_id, recipient_id, content, kind)?;
        let message = self.message_repository.append(new_message).await?;

        // 摘要缓存是展示用途，写失败只记录，不回滚已持久化的消息
        if let Err(err) = self
            .talk_repository
            .update_last_message(talk.id, &message.content, message.kind)
            .await
        {
            warn!(talk_id = %talk.id, error = %err, "更新会话摘要缓存失败");
        }

        let sender_profile = self.profile_of(sender_id).await;
        let view = MessageView::decorated(message.clone(), sender_profile.as_ref());

        match self
            .session_registry
            .deliver(recipient_id, ServerFrame::push(view))
            .await
        {
            DeliverOutcome::Delivered => {
                debug!(message_id = message.id, recipient = %recipient_id, "消息已实时推送")
            }
            DeliverOutcome::Offline => {
                debug!(message_id = message.id, recipient = %recipient_id, "接收方离线，待其拉取未读")
            }
        }

        // 发送回执：发送方没有活跃连接时直接丢弃
        let _ = self
            .session_registry
            .deliver(sender_id, ServerFrame::sent(message.id, talk.id))
            .await;

        Ok(message)
    }

    /// 将会话内发给 caller 的消息全部置为已读，返回影响条数
    ///
    /// 未知或不属于 caller 的 talk_id 不会匹配任何行，是幂等的
    /// 空操作成功，而不是错误。
    pub async fn mark_read(&self, caller_id: Uuid, talk_id: Uuid) -> ApplicationResult<u64> {
        let updated = self.message_repository.mark_read(talk_id, caller_id).await?;
        debug!(talk_id = %talk_id, user_id = %caller_id, updated, "已读标记完成");
        Ok(updated)
    }

    /// caller 的全部未读消息，最新在前，附带发送者展示信息
    pub async fn unread_messages(&self, caller_id: Uuid) -> ApplicationResult<Vec<MessageView>> {
        let messages = self.message_repository.unread_for(caller_id).await?;
        Ok(self.decorate_all(messages).await)
    }

    /// caller 与 other 之间最近一页历史，按时间正序返回
    ///
    /// 存储层按最新在前取出前 HISTORY_PAGE_SIZE 条，这里反转为
    /// 时间正序再交给客户端。
    pub async fn history_with(
        &self,
        caller_id: Uuid,
        other_id: Uuid,
    ) -> ApplicationResult<Vec<MessageView>> {
        let mut messages = self
            .message_repository
            .history_between(caller_id, other_id, HISTORY_PAGE_SIZE)
            .await?;
        messages.reverse();
        Ok(self.decorate_all(messages).await)
    }

    /// 软删除一条消息，仅原发送者可删除自己发出的消息
    pub async fn delete_message(&self, message_id: i64, caller_id: Uuid) -> ApplicationResult<()> {
        let message = self
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| {
                DomainError::resource_not_found("message", message_id.to_string())
            })?;
        if message.sender_id != caller_id {
            return Err(DomainError::permission_denied("只能删除自己发送的消息").into());
        }
        self.message_repository.soft_delete(message_id).await?;
        Ok(())
    }

    /// 查询发送者展示信息，失败降级为未装饰
    async fn profile_of(&self, user_id: Uuid) -> Option<UserProfile> {
        match self.user_repository.find_by_id(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "查询用户展示信息失败");
                None
            }
        }
    }

    async fn decorate_all(&self, messages: Vec<Message>) -> Vec<MessageView> {
        // 同一批消息里发送者大量重复，按发送者缓存一次查询
        let mut profiles: HashMap<Uuid, Option<UserProfile>> = HashMap::new();
        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            let sender_id = message.sender_id;
            if !profiles.contains_key(&sender_id) {
                let profile = self.profile_of(sender_id).await;
                profiles.insert(sender_id, profile);
            }
            let profile = profiles.get(&sender_id).and_then(|p| p.as_ref());
            views.push(MessageView::decorated(message, profile));
        }
        views
    }
}
