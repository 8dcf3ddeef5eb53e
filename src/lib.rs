pub mod ai;
pub mod chat;
pub mod config;
pub mod markdown;
pub mod session;
pub mod types;
