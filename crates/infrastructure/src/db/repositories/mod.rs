pub mod message_repository_impl;
pub mod talk_repository_impl;
pub mod user_repository_impl;

pub use message_repository_impl::PgMessageRepository;
pub use talk_repository_impl::PgTalkRepository;
pub use user_repository_impl::PgUserRepository;
