//! 会话目录的 Postgres 实现
//!
//! 规范对 (user_low, user_high) 上的唯一约束是并发创建的兜底：
//! get_or_create 走 upsert，竞争双方总是拿到同一行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use domain::repositories::TalkRepository;
use domain::{DomainError, DomainResult, MessageKind, Talk, TalkSetting};

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbTalk {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub last_content: Option<String>,
    pub last_kind: Option<String>,
    pub last_time: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbTalk> for Talk {
    fn from(row: DbTalk) -> Self {
        Talk {
            id: row.id,
            user_low: row.user_low,
            user_high: row.user_high,
            last_content: row.last_content,
            last_kind: row.last_kind.as_deref().map(MessageKind::from_str_or_text),
            last_time: row.last_time,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbTalkSetting {
    pub talk_id: Uuid,
    pub user_id: Uuid,
    pub pinned: bool,
    pub disabled: bool,
}

const TALK_COLUMNS: &str =
    "id, user_low, user_high, last_content, last_kind, last_time, deleted_at, created_at";

pub struct PgTalkRepository {
    pool: DbPool,
}

impl PgTalkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TalkRepository for PgTalkRepository {
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> DomainResult<Talk> {
        let (low, high) = Talk::canonical_pair(user_a, user_b);

        // upsert：已存在则复活可能的软删除行并返回，创建竞争的
        // 败方在这里直接拿到胜方的行
        let row = query_as::<_, DbTalk>(&format!(
            r#"
            INSERT INTO talks (user_low, user_high)
            VALUES ($1, $2)
            ON CONFLICT (user_low, user_high)
            DO UPDATE SET deleted_at = NULL
            RETURNING {}
            "#,
            TALK_COLUMNS
        ))
        .bind(low)
        .bind(high)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, talk_id: Uuid) -> DomainResult<Option<Talk>> {
        let row = query_as::<_, DbTalk>(&format!(
            "SELECT {} FROM talks WHERE id = $1 AND deleted_at IS NULL",
            TALK_COLUMNS
        ))
        .bind(talk_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row.map(|t| t.into()))
    }

    async fn update_last_message(
        &self,
        talk_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> DomainResult<()> {
        // 展示缓存，覆盖写入，last-writer-wins
        query(
            r#"
            UPDATE talks
            SET last_content = $2, last_kind = $3, last_time = NOW()
            WHERE id = $1
            "#,
        )
        .bind(talk_id)
        .bind(content)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(())
    }

    async fn set_pinned(&self, talk_id: Uuid, user_id: Uuid, pinned: bool) -> DomainResult<()> {
        query(
            r#"
            INSERT INTO talk_settings (talk_id, user_id, pinned)
            VALUES ($1, $2, $3)
            ON CONFLICT (talk_id, user_id)
            DO UPDATE SET pinned = EXCLUDED.pinned
            "#,
        )
        .bind(talk_id)
        .bind(user_id)
        .bind(pinned)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(())
    }

    async fn set_disabled(&self, talk_id: Uuid, user_id: Uuid, disabled: bool) -> DomainResult<()> {
        query(
            r#"
            INSERT INTO talk_settings (talk_id, user_id, disabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (talk_id, user_id)
            DO UPDATE SET disabled = EXCLUDED.disabled
            "#,
        )
        .bind(talk_id)
        .bind(user_id)
        .bind(disabled)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(())
    }

    async fn setting_for(&self, talk_id: Uuid, user_id: Uuid) -> DomainResult<TalkSetting> {
        let row = query_as::<_, DbTalkSetting>(
            "SELECT talk_id, user_id, pinned, disabled FROM talk_settings WHERE talk_id = $1 AND user_id = $2",
        )
        .bind(talk_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row
            .map(|s| TalkSetting {
                talk_id: s.talk_id,
                user_id: s.user_id,
                pinned: s.pinned,
                disabled: s.disabled,
            })
            .unwrap_or_else(|| TalkSetting::default_for(talk_id, user_id)))
    }

    async fn soft_delete(&self, talk_id: Uuid) -> DomainResult<()> {
        query("UPDATE talks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(talk_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Talk>> {
        let rows = query_as::<_, DbTalk>(
            r#"
            SELECT t.id, t.user_low, t.user_high, t.last_content, t.last_kind,
                   t.last_time, t.deleted_at, t.created_at
            FROM talks t
            LEFT JOIN talk_settings s ON s.talk_id = t.id AND s.user_id = $1
            WHERE (t.user_low = $1 OR t.user_high = $1)
              AND t.deleted_at IS NULL
              AND COALESCE(s.disabled, FALSE) = FALSE
            ORDER BY t.last_time DESC NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(rows.into_iter().map(|t| t.into()).collect())
    }
}
