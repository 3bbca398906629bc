use std::sync::Arc;

use application::{ChatService, SessionRegistry, TalkService};

use crate::auth::JwtService;

/// 网关共享状态
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub talk_service: Arc<TalkService>,
    pub session_registry: Arc<SessionRegistry>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        chat_service: Arc<ChatService>,
        talk_service: Arc<TalkService>,
        session_registry: Arc<SessionRegistry>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            chat_service,
            talk_service,
            session_registry,
            jwt_service,
        }
    }
}
