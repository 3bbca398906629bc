//! 内存实现的仓储（用于测试与本地开发）
//!
//! 与 Postgres 实现遵守相同的契约：规范对唯一、排序以
//! (created_at, id) 全序、软删除行对查询不可见。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::repositories::{MessageRepository, TalkRepository, UserRepository};
use domain::{DomainResult, Message, MessageKind, NewMessage, Talk, TalkSetting, UserProfile};

/// 内存消息仓储
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
    next_id: AtomicI64,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: NewMessage) -> DomainResult<Message> {
        let now = Utc::now();
        let stored = Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            talk_id: message.talk_id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            content: message.content,
            kind: message.kind,
            is_read: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, message_id: i64) -> DomainResult<Option<Message>> {
        let messages = self.messages.read().await;
        Ok(messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn mark_read(&self, talk_id: Uuid, recipient_id: Uuid) -> DomainResult<u64> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for message in messages.iter_mut() {
            if message.talk_id == talk_id
                && message.recipient_id == recipient_id
                && !message.is_read
                && !message.is_deleted
            {
                message.is_read = true;
                message.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_for(&self, user_id: Uuid) -> DomainResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut unread: Vec<Message> = messages
            .iter()
            .filter(|m| m.recipient_id == user_id && !m.is_read && !m.is_deleted)
            .cloned()
            .collect();
        unread.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(unread)
    }

    async fn history_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        limit: u32,
    ) -> DomainResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut history: Vec<Message> = messages
            .iter()
            .filter(|m| {
                !m.is_deleted
                    && ((m.sender_id == user_id && m.recipient_id == other_id)
                        || (m.sender_id == other_id && m.recipient_id == user_id))
            })
            .cloned()
            .collect();
        history.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        history.truncate(limit as usize);
        Ok(history)
    }

    async fn soft_delete(&self, message_id: i64) -> DomainResult<()> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.iter_mut().find(|m| m.id == message_id) {
            message.is_deleted = true;
            message.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// 内存会话目录
#[derive(Default)]
pub struct InMemoryTalkRepository {
    talks: RwLock<HashMap<Uuid, Talk>>,
    pair_index: RwLock<HashMap<(Uuid, Uuid), Uuid>>,
    settings: RwLock<HashMap<(Uuid, Uuid), TalkSetting>>,
}

impl InMemoryTalkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TalkRepository for InMemoryTalkRepository {
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> DomainResult<Talk> {
        let pair = Talk::canonical_pair(user_a, user_b);
        // 写锁覆盖查找与插入，等价于数据库的唯一约束兜底
        let mut index = self.pair_index.write().await;
        if let Some(talk_id) = index.get(&pair) {
            let mut talks = self.talks.write().await;
            if let Some(talk) = talks.get_mut(talk_id) {
                // 软删除的会话在此复活，同一行而不是新行
                talk.deleted_at = None;
                return Ok(talk.clone());
            }
        }
        let talk = Talk {
            id: Uuid::new_v4(),
            user_low: pair.0,
            user_high: pair.1,
            last_content: None,
            last_kind: None,
            last_time: None,
            deleted_at: None,
            created_at: Utc::now(),
        };
        index.insert(pair, talk.id);
        self.talks.write().await.insert(talk.id, talk.clone());
        Ok(talk)
    }

    async fn find_by_id(&self, talk_id: Uuid) -> DomainResult<Option<Talk>> {
        Ok(self
            .talks
            .read()
            .await
            .get(&talk_id)
            .filter(|t| t.deleted_at.is_none())
            .cloned())
    }

    async fn update_last_message(
        &self,
        talk_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> DomainResult<()> {
        let mut talks = self.talks.write().await;
        if let Some(talk) = talks.get_mut(&talk_id) {
            talk.last_content = Some(content.to_string());
            talk.last_kind = Some(kind);
            talk.last_time = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_pinned(&self, talk_id: Uuid, user_id: Uuid, pinned: bool) -> DomainResult<()> {
        let mut settings = self.settings.write().await;
        settings
            .entry((talk_id, user_id))
            .or_insert_with(|| TalkSetting::default_for(talk_id, user_id))
            .pinned = pinned;
        Ok(())
    }

    async fn set_disabled(&self, talk_id: Uuid, user_id: Uuid, disabled: bool) -> DomainResult<()> {
        let mut settings = self.settings.write().await;
        settings
            .entry((talk_id, user_id))
            .or_insert_with(|| TalkSetting::default_for(talk_id, user_id))
            .disabled = disabled;
        Ok(())
    }

    async fn setting_for(&self, talk_id: Uuid, user_id: Uuid) -> DomainResult<TalkSetting> {
        let settings = self.settings.read().await;
        Ok(settings
            .get(&(talk_id, user_id))
            .cloned()
            .unwrap_or_else(|| TalkSetting::default_for(talk_id, user_id)))
    }

    async fn soft_delete(&self, talk_id: Uuid) -> DomainResult<()> {
        let mut talks = self.talks.write().await;
        if let Some(talk) = talks.get_mut(&talk_id) {
            if talk.deleted_at.is_none() {
                talk.deleted_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Talk>> {
        let talks = self.talks.read().await;
        let settings = self.settings.read().await;
        let mut result: Vec<Talk> = talks
            .values()
            .filter(|t| t.deleted_at.is_none() && t.has_participant(user_id))
            .filter(|t| {
                settings
                    .get(&(t.id, user_id))
                    .map(|s| !s.disabled)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.last_time.cmp(&a.last_time));
        Ok(result)
    }
}

/// 内存用户目录
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> DomainResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}
