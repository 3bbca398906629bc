pub mod message_repository;
pub mod talk_repository;
pub mod user_repository;

pub use message_repository::MessageRepository;
pub use talk_repository::TalkRepository;
pub use user_repository::UserRepository;
