pub mod chat_service;
pub mod talk_service;

#[cfg(test)]
mod talk_service_tests;

pub use chat_service::{ChatService, ChatServiceDependencies};
pub use talk_service::TalkService;
