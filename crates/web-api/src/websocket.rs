//! WebSocket 连接升级
//!
//! 认证先于一切：凭证缺失或无效的连接在到达会话注册表之前
//! 就以 401 拒绝。

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::AppState;
use crate::ws_connection::WsConnection;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// bearer 凭证，亦可经 Authorization 头提供
    pub token: Option<String>,
}

/// 处理 WebSocket 连接升级
pub async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let user_id = match state
        .jwt_service
        .extract_user(query.token.as_deref(), &headers)
    {
        Ok(user_id) => user_id,
        Err(_) => {
            warn!("WebSocket upgrade rejected: invalid or missing token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    info!(user_id = %user_id, "WebSocket upgrade");

    Ok(ws.on_upgrade(move |socket| WsConnection::new(state, user_id).run(socket)))
}
