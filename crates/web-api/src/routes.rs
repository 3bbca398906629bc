//! HTTP 路由
//!
//! WebSocket 升级端点之外，提供会话管理所需的少量 REST 接口。
//! 所有 /api 端点都要求 Authorization 头携带 bearer 凭证。

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use domain::TalkView;

use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket;

/// 构建完整路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::handle_upgrade))
        .route("/api/talks", get(list_talks))
        .route("/api/talks/{talk_id}/pin", put(pin_talk))
        .route("/api/talks/{talk_id}/disable", put(disable_talk))
        .route("/api/talks/{talk_id}", delete(delete_talk))
        .route("/api/messages/{message_id}", delete(delete_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 当前用户的会话列表
async fn list_talks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TalkView>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let talks = state.talk_service.list_for_user(user_id).await?;
    Ok(Json(talks))
}

#[derive(Debug, Deserialize)]
struct PinRequest {
    pinned: bool,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    success: bool,
}

/// 置顶/取消置顶，仅影响当前用户一侧
async fn pin_talk(
    State(state): State<AppState>,
    Path(talk_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<PinRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .talk_service
        .set_pinned(talk_id, user_id, request.pinned)
        .await?;
    Ok(Json(OkResponse { success: true }))
}

/// 从当前用户的会话列表中隐藏该会话
async fn disable_talk(
    State(state): State<AppState>,
    Path(talk_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.talk_service.disable(talk_id, user_id).await?;
    Ok(Json(OkResponse { success: true }))
}

/// 软删除会话，历史保留，再次互发消息时复活
async fn delete_talk(
    State(state): State<AppState>,
    Path(talk_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.talk_service.delete(talk_id, user_id).await?;
    Ok(Json(OkResponse { success: true }))
}

/// 软删除一条自己发送的消息
async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .chat_service
        .delete_message(message_id, user_id)
        .await?;
    Ok(Json(OkResponse { success: true }))
}
