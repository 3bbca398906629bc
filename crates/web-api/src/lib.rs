//! WebSocket 网关与 HTTP 接口
//!
//! 连接升级与 bearer 认证、每连接一个的消息路由器、
//! 以及会话管理的少量 REST 端点。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;
pub mod ws_connection;

pub use auth::{Claims, JwtService};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
