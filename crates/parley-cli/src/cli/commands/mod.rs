pub mod chat;
pub mod config;
pub mod conversations;
pub mod models;
