pub mod frame;
pub mod message;
pub mod talk;
pub mod user;
