//! 消息仓储的 Postgres 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use domain::repositories::MessageRepository;
use domain::{DomainError, DomainResult, Message, MessageKind, NewMessage};

use crate::db::DbPool;

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: i64,
    pub talk_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub kind: String,
    pub is_read: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        Message {
            id: row.id,
            talk_id: row.talk_id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            content: row.content,
            kind: MessageKind::from_str_or_text(&row.kind),
            is_read: row.is_read,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, talk_id, sender_id, recipient_id, content, kind, is_read, is_deleted, created_at, updated_at";

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: NewMessage) -> DomainResult<Message> {
        let row = query_as::<_, DbMessage>(&format!(
            r#"
            INSERT INTO messages (talk_id, sender_id, recipient_id, content, kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.talk_id)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(message.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, message_id: i64) -> DomainResult<Option<Message>> {
        let row = query_as::<_, DbMessage>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row.map(|m| m.into()))
    }

    async fn mark_read(&self, talk_id: Uuid, recipient_id: Uuid) -> DomainResult<u64> {
        let result = query(
            r#"
            UPDATE messages
            SET is_read = TRUE, updated_at = NOW()
            WHERE talk_id = $1 AND recipient_id = $2 AND is_read = FALSE AND is_deleted = FALSE
            "#,
        )
        .bind(talk_id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn unread_for(&self, user_id: Uuid) -> DomainResult<Vec<Message>> {
        let rows = query_as::<_, DbMessage>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE recipient_id = $1 AND is_read = FALSE AND is_deleted = FALSE
            ORDER BY created_at DESC, id DESC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(rows.into_iter().map(|m| m.into()).collect())
    }

    async fn history_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        limit: u32,
    ) -> DomainResult<Vec<Message>> {
        // 双向对称查询，时间戳相同以 id 决胜保证全序
        let rows = query_as::<_, DbMessage>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE is_deleted = FALSE
              AND ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(user_id)
        .bind(other_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(rows.into_iter().map(|m| m.into()).collect())
    }

    async fn soft_delete(&self, message_id: i64) -> DomainResult<()> {
        query("UPDATE messages SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(())
    }
}
