//! 基础设施层
//!
//! Postgres 仓储实现与连接池构建。

pub mod db;

pub use db::repositories::{PgMessageRepository, PgTalkRepository, PgUserRepository};
pub use db::{create_pg_pool, DbPool};
