//! 用户目录的 Postgres 实现
//!
//! 只读查询，装饰消息与会话摘要用。

use async_trait::async_trait;
use sqlx::{query_as, FromRow};
use uuid::Uuid;

use domain::repositories::UserRepository;
use domain::{DomainError, DomainResult, UserProfile};

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> DomainResult<Option<UserProfile>> {
        let row = query_as::<_, DbUser>(
            "SELECT id, display_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database_error(e.to_string()))?;

        Ok(row.map(|u| UserProfile {
            id: u.id,
            display_name: u.display_name,
            avatar_url: u.avatar_url,
        }))
    }
}
