//! 主应用程序入口
//!
//! 组装存储、会话注册表与网关路由，启动 Axum 服务。

use std::sync::Arc;

use application::{ChatService, ChatServiceDependencies, SessionRegistry, TalkService};
use config::AppConfig;
use infrastructure::{create_pg_pool, PgMessageRepository, PgTalkRepository, PgUserRepository};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 仓储实现
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let talk_repository = Arc::new(PgTalkRepository::new(pg_pool.clone()));
    let user_repository = Arc::new(PgUserRepository::new(pg_pool));

    // 会话注册表：本子系统唯一的共享可变状态
    let session_registry = Arc::new(SessionRegistry::new());

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        message_repository,
        talk_repository: talk_repository.clone(),
        user_repository: user_repository.clone(),
        session_registry: session_registry.clone(),
    }));
    let talk_service = Arc::new(TalkService::new(talk_repository, user_repository));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(chat_service, talk_service, session_registry, jwt_service);

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("即时通讯网关启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
